use anyhow::Result;
use input_actions::clock::FrameClock;
use input_actions::devices::KeyboardController;
use input_actions::input::{
    converter, trigger, Action, ActionEvent, CompositeBinding, InputManager, SingleBinding,
};
use log::info;
use std::rc::Rc;
use winit::{
    event::{Event, WindowEvent},
    event_loop::EventLoop,
    window::WindowBuilder,
};

fn player_actions(manager: &mut InputManager) -> Result<()> {
    let group = manager.get_or_create_action_group("player");

    let mut jump = Action::new("jump", false);
    jump.add_binding(SingleBinding::<bool>::new("<keyboard>/Space")?);
    jump.on(ActionEvent::Started, |_, _| info!("Jump"));
    group.add_action(jump);

    let mut charge = Action::new("charge", false);
    charge.add_binding(
        SingleBinding::<bool>::new("<keyboard>/KeyE")?.with_trigger(trigger::hold(0.5)),
    );
    charge.on(ActionEvent::Started, |_, _| info!("Charge ready"));
    charge.on(ActionEvent::Ended, |_, _| info!("Charge released"));
    group.add_action(charge);

    let mut walk = Action::new("walk", 0.0f32);
    walk.add_binding(CompositeBinding::<f32, f32>::new(
        &["<keyboard>/KeyA", "<keyboard>/KeyD"],
        converter::composite_axis(),
    )?);
    walk.add_binding(CompositeBinding::<f32, f32>::new(
        &["<keyboard>/ArrowLeft", "<keyboard>/ArrowRight"],
        converter::composite_axis(),
    )?);
    walk.on(ActionEvent::Started, |action, _| info!("Walk {:+.0}", action.value()));
    walk.on(ActionEvent::Ended, |_, _| info!("Stop"));
    group.add_action(walk);

    Ok(())
}

fn main() -> Result<()> {
    // Initialize logger
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();

    info!("Starting input demo...");

    let mut manager = InputManager::new();
    player_actions(&mut manager)?;

    let keyboard = Rc::new(KeyboardController::new());
    manager.add_controller(keyboard.clone());

    let event_loop = EventLoop::new()?;
    let window = WindowBuilder::new()
        .with_title("Input Actions")
        .with_inner_size(winit::dpi::LogicalSize::new(640, 360))
        .build(&event_loop)?;

    info!("Window created; Space jumps, hold E to charge, A/D or arrows walk");

    let mut clock = FrameClock::new();

    event_loop
        .run(move |event, elwt| match event {
            Event::WindowEvent {
                event: WindowEvent::CloseRequested,
                ..
            } => {
                info!("Close requested, shutting down...");
                elwt.exit();
            }
            Event::WindowEvent {
                event: WindowEvent::KeyboardInput { event, .. },
                ..
            } => {
                keyboard.process_keyboard_event(&event);
            }
            Event::WindowEvent {
                event: WindowEvent::Focused(focused),
                ..
            } => {
                if !focused {
                    keyboard.release_all();
                }
            }
            Event::AboutToWait => {
                manager.update(clock.tick());
                window.request_redraw();
            }
            _ => {}
        })
        .map_err(|e| anyhow::anyhow!("Event loop error: {}", e))?;

    Ok(())
}
