// Input paths - addressing controllers and their controls
//
// A path has the form `<[handedness/]controller/segments>/control/segments`.
// Controller segments are literals, `*` (any single segment) or an inline
// pattern `{body/flags}` (a leading slash in the body, `{/body/flags}`, is
// also accepted).

use super::InputError;
use regex::{Regex, RegexBuilder};
use std::fmt;
use std::str::FromStr;

/// Which hand a controller is held in (or which hands a path accepts)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Handedness {
    Left,
    Right,
    /// Paths only: accept any controller regardless of handedness
    #[default]
    All,
    /// Controllers that are not held in a hand
    None,
}

impl Handedness {
    fn from_prefix(segment: &str) -> Option<Self> {
        match segment {
            "left" => Some(Self::Left),
            "right" => Some(Self::Right),
            "all" => Some(Self::All),
            "none" => Some(Self::None),
            _ => None,
        }
    }

    /// Whether a path with this handedness accepts a controller reporting `controller`
    pub fn accepts(self, controller: Handedness) -> bool {
        self == Handedness::All || self == controller
    }

    /// Prefix spelling, e.g. `"left"`
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Left => "left",
            Self::Right => "right",
            Self::All => "all",
            Self::None => "none",
        }
    }
}

/// One segment of a controller path
#[derive(Debug, Clone)]
pub enum PathSegment {
    Literal(String),
    Any,
    Pattern(Regex),
}

impl PathSegment {
    /// Check a controller's own path segment against this one
    pub fn matches(&self, segment: &str) -> bool {
        match self {
            PathSegment::Literal(literal) => literal == segment,
            PathSegment::Any => true,
            PathSegment::Pattern(regex) => regex.is_match(segment),
        }
    }

    /// Wildcards carry no specificity; literals and patterns do
    pub fn is_specific(&self) -> bool {
        !matches!(self, PathSegment::Any)
    }

    fn parse(raw: &str, path: &str) -> Result<Self, InputError> {
        if raw == "*" {
            return Ok(PathSegment::Any);
        }
        if let Some(inner) = raw.strip_prefix('{') {
            let inner = inner
                .strip_suffix('}')
                .ok_or_else(|| malformed(path, "unterminated pattern segment"))?;
            let inner = inner.strip_prefix('/').unwrap_or(inner);
            let (body, flags) = inner
                .rsplit_once('/')
                .ok_or_else(|| malformed(path, "pattern segment is missing its flags separator"))?;
            return Ok(PathSegment::Pattern(build_pattern(body, flags, path)?));
        }
        if raw.is_empty() {
            return Err(malformed(path, "empty controller segment"));
        }
        if raw.contains(|c| c == '<' || c == '>') {
            return Err(malformed(path, "unexpected '<' or '>' in controller path"));
        }
        Ok(PathSegment::Literal(raw.to_string()))
    }
}

fn build_pattern(body: &str, flags: &str, path: &str) -> Result<Regex, InputError> {
    let mut builder = RegexBuilder::new(body);
    for flag in flags.chars() {
        match flag {
            'i' => {
                builder.case_insensitive(true);
            }
            'm' => {
                builder.multi_line(true);
            }
            's' => {
                builder.dot_matches_new_line(true);
            }
            // Matching is always unicode-aware and a single test per segment
            'u' | 'g' | 'y' => {}
            other => {
                return Err(malformed(path, &format!("unsupported pattern flag '{other}'")));
            }
        }
    }
    Ok(builder.build()?)
}

fn malformed(path: &str, reason: &str) -> InputError {
    InputError::MalformedPath {
        path: path.to_string(),
        reason: reason.to_string(),
    }
}

/// Split the controller part on `/`, keeping `{...}` pattern segments whole
fn split_controller(controller: &str, path: &str) -> Result<Vec<String>, InputError> {
    let mut segments = Vec::new();
    let mut rest = controller;
    while !rest.is_empty() {
        if rest.starts_with('{') {
            // A pattern ends at the first `}` that closes the segment
            let end = rest
                .match_indices('}')
                .map(|(i, _)| i)
                .find(|&i| rest[i + 1..].is_empty() || rest[i + 1..].starts_with('/'))
                .ok_or_else(|| malformed(path, "unterminated pattern segment"))?;
            segments.push(rest[..=end].to_string());
            rest = &rest[end + 1..];
        } else {
            let end = rest.find('/').unwrap_or(rest.len());
            segments.push(rest[..end].to_string());
            rest = &rest[end..];
        }
        if let Some(stripped) = rest.strip_prefix('/') {
            if stripped.is_empty() {
                return Err(malformed(path, "trailing '/' in controller path"));
            }
            rest = stripped;
        }
    }
    Ok(segments)
}

/// A parsed controller/control address
#[derive(Debug, Clone)]
pub struct InputPath {
    raw: String,
    handedness: Handedness,
    controller: Vec<PathSegment>,
    control: Vec<String>,
    priority: i32,
}

impl InputPath {
    /// Parse the full `<controller>/control` form
    pub fn parse(path: &str) -> Result<Self, InputError> {
        let inner = path
            .strip_prefix('<')
            .ok_or_else(|| malformed(path, "expected the form \"<controllerPath>/controlPath\""))?;
        let (controller, control) = inner
            .rsplit_once(">/")
            .ok_or_else(|| malformed(path, "expected the form \"<controllerPath>/controlPath\""))?;
        Self::build(path.to_string(), controller, control)
    }

    /// Build a path from its controller and control halves
    pub fn from_parts(controller: &str, control: &str) -> Result<Self, InputError> {
        Self::build(format!("<{controller}>/{control}"), controller, control)
    }

    fn build(raw: String, controller: &str, control: &str) -> Result<Self, InputError> {
        let mut raw_segments = split_controller(controller, &raw)?;
        let mut handedness = Handedness::All;
        if let Some(first) = raw_segments.first() {
            if let Some(parsed) = Handedness::from_prefix(first) {
                handedness = parsed;
                raw_segments.remove(0);
            }
        }
        if raw_segments.is_empty() {
            return Err(malformed(&raw, "no controller segments"));
        }

        let controller = raw_segments
            .iter()
            .map(|segment| PathSegment::parse(segment, &raw))
            .collect::<Result<Vec<_>, _>>()?;

        if control.is_empty() || control.split('/').any(str::is_empty) {
            return Err(malformed(&raw, "empty control segment"));
        }
        let control = control.split('/').map(str::to_string).collect();

        // The most specific (rightmost non-wildcard) segment decides priority
        let priority = controller
            .iter()
            .rposition(PathSegment::is_specific)
            .unwrap_or(0) as i32;

        Ok(Self {
            raw,
            handedness,
            controller,
            control,
            priority,
        })
    }

    /// The path as written
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Hand prefix, `All` when the path has none
    pub fn handedness(&self) -> Handedness {
        self.handedness
    }

    /// Controller segments, without the hand prefix
    pub fn controller_segments(&self) -> &[PathSegment] {
        &self.controller
    }

    /// Control segments after `>/`
    pub fn control_segments(&self) -> &[String] {
        &self.control
    }

    /// Specificity rank used during binding arbitration (higher wins)
    pub fn priority(&self) -> i32 {
        self.priority
    }

    /// Match a controller's path segments.
    ///
    /// Every pattern segment must match the controller segment at the same
    /// index; a controller path may be longer than the pattern.
    pub fn matches_controller<S: AsRef<str>>(&self, segments: &[S]) -> bool {
        if segments.len() < self.controller.len() {
            return false;
        }
        self.controller
            .iter()
            .zip(segments)
            .rev()
            .all(|(pattern, segment)| pattern.matches(segment.as_ref()))
    }
}

impl fmt::Display for InputPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl FromStr for InputPath {
    type Err = InputError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simple_path() {
        let path = InputPath::parse("<keyboard>/KeyA").unwrap();
        assert_eq!(path.handedness(), Handedness::All);
        assert_eq!(path.controller_segments().len(), 1);
        assert_eq!(path.control_segments(), &["KeyA".to_string()]);
        assert_eq!(path.priority(), 0);
        assert_eq!(path.to_string(), "<keyboard>/KeyA");
    }

    #[test]
    fn test_parse_handedness_prefix() {
        let path = InputPath::parse("<left/xr/controller>/trigger/value").unwrap();
        assert_eq!(path.handedness(), Handedness::Left);
        assert_eq!(path.controller_segments().len(), 2);
        assert_eq!(
            path.control_segments(),
            &["trigger".to_string(), "value".to_string()]
        );
    }

    #[test]
    fn test_priority_ignores_trailing_wildcards() {
        let generic = InputPath::parse("<gamepad/*>/buttonA").unwrap();
        let specific = InputPath::parse("<gamepad/xbox>/buttonA").unwrap();
        let any = InputPath::parse("<*>/buttonA").unwrap();

        assert_eq!(generic.priority(), 0);
        assert_eq!(specific.priority(), 1);
        assert_eq!(any.priority(), 0);
        assert!(specific.priority() > generic.priority());
    }

    #[test]
    fn test_pattern_segment() {
        let path = InputPath::parse("<gamepad/{xbox|dualshock/i}>/buttonA").unwrap();
        assert!(matches!(path.controller_segments()[1], PathSegment::Pattern(_)));
        assert_eq!(path.priority(), 1);

        assert!(path.matches_controller(&["gamepad", "XBOX"]));
        assert!(path.matches_controller(&["gamepad", "dualshock"]));
        assert!(!path.matches_controller(&["gamepad", "switch"]));
    }

    #[test]
    fn test_pattern_segment_with_leading_slash() {
        let path = InputPath::parse("<gamepad/{/^x.*$/}>/buttonA").unwrap();
        assert!(path.matches_controller(&["gamepad", "xinput"]));
        assert!(!path.matches_controller(&["gamepad", "dinput"]));
    }

    #[test]
    fn test_matches_controller_prefix() {
        let path = InputPath::parse("<gamepad>/buttonA").unwrap();
        assert!(path.matches_controller(&["gamepad", "xbox"]));
        assert!(!path.matches_controller(&["keyboard"]));

        let deep = InputPath::parse("<gamepad/xbox/elite>/buttonA").unwrap();
        assert!(!deep.matches_controller(&["gamepad", "xbox"]));
    }

    #[test]
    fn test_from_parts() {
        let path = InputPath::from_parts("right/xr", "grip").unwrap();
        assert_eq!(path.handedness(), Handedness::Right);
        assert_eq!(path.as_str(), "<right/xr>/grip");
    }

    #[test]
    fn test_malformed_paths_fail() {
        assert!(InputPath::parse("keyboard/KeyA").is_err());
        assert!(InputPath::parse("<keyboard>").is_err());
        assert!(InputPath::parse("<keyboard>/").is_err());
        assert!(InputPath::parse("<left>/KeyA").is_err());
        assert!(InputPath::parse("<gamepad/{abc>/x").is_err());
        assert!(InputPath::parse("<gamepad/{(/}>/x").is_err());
        assert!(InputPath::parse("<gamepad/{abc/q}>/x").is_err());
        assert!(InputPath::parse("<a>/b>/c").is_err());
        assert!(InputPath::from_parts("gamepad>", "x").is_err());
    }

    #[test]
    fn test_handedness_accepts() {
        assert!(Handedness::All.accepts(Handedness::Left));
        assert!(Handedness::Left.accepts(Handedness::Left));
        assert!(!Handedness::Left.accepts(Handedness::Right));
        assert!(Handedness::None.accepts(Handedness::None));
        assert!(!Handedness::None.accepts(Handedness::Left));
    }
}
