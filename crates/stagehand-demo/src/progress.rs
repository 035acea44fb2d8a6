use std::cell::Cell;
use std::rc::Rc;

use stagehand_engine::events::{DrawPass, EventManager, Priority};
use stagehand_engine::render::{Color, Quad, Rect};

/// Registers a bar that fills over `duration` simulated seconds.
///
/// Meant for the load-phase event manager: the stage clears it when loading ends.
pub fn add_progress_bar(events: &mut EventManager, duration: f64, track: Color, fill: Color) {
    let elapsed = Rc::new(Cell::new(0.0f64));

    let clock = Rc::clone(&elapsed);
    events.add_update_listener(Priority::MEDIUM, move |dt| clock.set(clock.get() + dt as f64));

    events.add_draw_listener(DrawPass::Overlay, Priority::MEDIUM, move |r| {
        let vp = r.viewport();
        let fraction = if duration > 0.0 { (elapsed.get() / duration).min(1.0) as f32 } else { 1.0 };
        let (w, h) = (vp.width * 0.5, 10.0);
        let (x, y) = ((vp.width - w) * 0.5, vp.height * 0.8);
        r.draw_quad(Quad::new(Rect::new(x - 2.0, y - 2.0, w + 4.0, h + 4.0), track));
        r.draw_quad(Quad::new(Rect::new(x, y, w * fraction, h), fill));
    });
}
