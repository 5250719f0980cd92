use std::time::Instant;

use anyhow::{anyhow, Result};
use scheduler::{Dimensions, TickOutcome};
use tracing::{error, info};
use winit::dpi::{PhysicalPosition, PhysicalSize};
use winit::event::{ElementState, Event, KeyEvent, MouseButton, WindowEvent};
use winit::event_loop::{ControlFlow, EventLoop};
use winit::keyboard::{Key, NamedKey};
use winit::window::{Window, WindowBuilder};

use crate::session::FeedbackSession;
use crate::types::RendererConfig;

/// Preview window state. `session` is declared before `window` so the
/// surface is dropped while the native window still exists.
struct PreviewState {
    session: FeedbackSession,
    window: Window,
    mouse: MouseState,
}

impl PreviewState {
    fn new(window: Window, config: &RendererConfig, source: &str) -> Result<Self> {
        let session = FeedbackSession::initialize(&window, config, source)?;
        Ok(Self {
            session,
            window,
            mouse: MouseState::default(),
        })
    }

    fn handle_click(&mut self, button: MouseButton) {
        let zoom_in = match button {
            MouseButton::Left => true,
            MouseButton::Right => false,
            _ => return,
        };
        let Some(position) = self.mouse.position else {
            return;
        };
        let pixel = window_to_buffer_pixel(
            position,
            self.window.inner_size(),
            self.session.dimensions(),
        );
        if self.session.request_zoom(pixel, zoom_in) {
            self.window.request_redraw();
        }
    }

    fn handle_key(&mut self, event: &KeyEvent) -> KeyAction {
        if event.state != ElementState::Pressed || event.repeat {
            return KeyAction::None;
        }
        match &event.logical_key {
            Key::Named(NamedKey::Escape) => KeyAction::Exit,
            Key::Character(value) if value.as_str().eq_ignore_ascii_case("r") => {
                if self.session.restart() {
                    self.window.request_redraw();
                }
                KeyAction::None
            }
            _ => KeyAction::None,
        }
    }
}

enum KeyAction {
    None,
    Exit,
}

#[derive(Default)]
struct MouseState {
    position: Option<PhysicalPosition<f64>>,
}

/// Rescales a cursor position from window pixels to buffer pixels, in case
/// the compositor sized the window differently from the surface.
fn window_to_buffer_pixel(
    position: PhysicalPosition<f64>,
    window_size: PhysicalSize<u32>,
    dimensions: Dimensions,
) -> [f64; 2] {
    let scale_x = f64::from(dimensions.width) / f64::from(window_size.width.max(1));
    let scale_y = f64::from(dimensions.height) / f64::from(window_size.height.max(1));
    [position.x * scale_x, position.y * scale_y]
}

/// Opens the preview window and drives the feedback loop until the window
/// closes or a step fails.
///
/// Left click zooms in around the cursor, right click zooms out, `R`
/// restarts an exhausted loop and `Escape` exits.
pub fn run_window(config: &RendererConfig, source: &str) -> Result<()> {
    let event_loop =
        EventLoop::new().map_err(|err| anyhow!("failed to create event loop: {err}"))?;
    let window = WindowBuilder::new()
        .with_title(config.title.as_str())
        .with_inner_size(PhysicalSize::new(
            config.dimensions.width,
            config.dimensions.height,
        ))
        .with_resizable(false)
        .build(&event_loop)
        .map_err(|err| anyhow!("failed to create preview window: {err}"))?;

    let mut state = PreviewState::new(window, config, source)?;
    state.window.request_redraw();

    let mut failure = None;
    let run_result = event_loop.run(|event, elwt| match event {
        Event::WindowEvent { window_id, event } if window_id == state.window.id() => match event {
            WindowEvent::CloseRequested | WindowEvent::Destroyed => {
                elwt.exit();
            }
            WindowEvent::KeyboardInput { event, .. } => {
                if let KeyAction::Exit = state.handle_key(&event) {
                    elwt.exit();
                }
            }
            WindowEvent::CursorMoved { position, .. } => {
                state.mouse.position = Some(position);
            }
            WindowEvent::CursorLeft { .. } => {
                state.mouse.position = None;
            }
            WindowEvent::MouseInput {
                state: ElementState::Pressed,
                button,
                ..
            } => {
                state.handle_click(button);
            }
            WindowEvent::RedrawRequested => match state.session.tick(Instant::now()) {
                Ok(TickOutcome::Exhausted) => {
                    tracing::trace!("feedback loop exhausted; ignoring redraw");
                }
                Ok(outcome) => {
                    tracing::trace!(?outcome, "tick");
                }
                Err(err) => {
                    error!(error = %err, "feedback loop halted");
                    failure = Some(anyhow!("feedback loop halted: {err}"));
                    elwt.exit();
                }
            },
            _ => {}
        },
        Event::AboutToWait => {
            let now = Instant::now();
            match state.session.next_deadline(now) {
                Some(deadline) if deadline <= now => {
                    state.window.request_redraw();
                    elwt.set_control_flow(ControlFlow::Wait);
                }
                Some(deadline) => {
                    elwt.set_control_flow(ControlFlow::WaitUntil(deadline));
                }
                None => {
                    elwt.set_control_flow(ControlFlow::Wait);
                }
            }
        }
        _ => {}
    });

    if let Err(err) = run_result {
        return Err(anyhow!("window event loop error: {err}"));
    }
    match failure {
        Some(err) => Err(err),
        None => {
            info!(
                state = ?state.session.state(),
                steps = state.session.steps_completed(),
                "preview window closed"
            );
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cursor_maps_one_to_one_when_sizes_match() {
        let pixel = window_to_buffer_pixel(
            PhysicalPosition::new(250.0, 750.0),
            PhysicalSize::new(1000, 1000),
            Dimensions::new(1000, 1000),
        );
        assert_eq!(pixel, [250.0, 750.0]);
    }

    #[test]
    fn cursor_is_rescaled_to_buffer_pixels() {
        let pixel = window_to_buffer_pixel(
            PhysicalPosition::new(100.0, 300.0),
            PhysicalSize::new(2000, 600),
            Dimensions::new(1000, 1200),
        );
        assert_eq!(pixel, [50.0, 600.0]);
    }
}
