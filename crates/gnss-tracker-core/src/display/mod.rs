//! E-paper display controller
//!
//! Layout on the 250x122 panel:
//! - a frame rectangle around the readings
//! - three atmospheric rows (temperature, humidity, pressure)
//! - two position rows (latitude, longitude)
//! - a small refresh counter in the bottom right corner
//!
//! Every update claims the [`RenderGuard`] first; updates arriving during a
//! render are skipped. Drawing errors are logged and never propagate.

pub mod framebuffer;
pub mod guard;
pub mod text;

use core::cell::{Cell, Ref, RefCell};
use core::fmt::Debug;

use embedded_graphics::mono_font::MonoTextStyle;
use embedded_graphics::mono_font::iso_8859_1::{FONT_4X6, FONT_10X20};
use embedded_graphics::pixelcolor::BinaryColor;
use embedded_graphics::prelude::*;
use embedded_graphics::primitives::{PrimitiveStyle, Rectangle};
use embedded_graphics::text::{Baseline, Text};
use log::{debug, error};

pub use framebuffer::FrameBuffer;
pub use guard::{RenderGuard, RenderPass};

use crate::model::{AtmosphericModel, CurrentConditions, LocationModel};

pub const INK: BinaryColor = BinaryColor::On;
pub const PAPER: BinaryColor = BinaryColor::Off;

const FRAME: Rectangle = Rectangle::new(Point::new(5, 5), Size::new(240, 112));
const ATMOSPHERIC_REGION: Rectangle = Rectangle::new(Point::new(10, 10), Size::new(230, 60));
const POSITION_REGION: Rectangle = Rectangle::new(Point::new(10, 72), Size::new(230, 40));
const COUNTER_REGION: Rectangle = Rectangle::new(Point::new(222, 113), Size::new(20, 8));

const TEXT_X: i32 = 10;
const TEMPERATURE_Y: i32 = 10;
const HUMIDITY_Y: i32 = 30;
const PRESSURE_Y: i32 = 50;
const LATITUDE_Y: i32 = 72;
const LONGITUDE_Y: i32 = 92;

/// A monochrome panel that needs an explicit refresh after drawing.
pub trait Panel: DrawTarget<Color = BinaryColor> {
    /// Push the drawn content to the glass.
    fn show(&mut self) -> Result<(), Self::Error>;
}

/// What happened to a display update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderOutcome {
    Rendered,
    /// Another render held the guard; nothing was drawn
    Skipped,
    /// Drawing failed part way; the panel may be partially drawn
    Failed,
}

fn draw_line<D>(display: &mut D, line: &str, y: i32) -> Result<(), D::Error>
where
    D: DrawTarget<Color = BinaryColor>,
{
    Text::with_baseline(
        line,
        Point::new(TEXT_X, y),
        MonoTextStyle::new(&FONT_10X20, INK),
        Baseline::Top,
    )
    .draw(display)?;
    Ok(())
}

fn clear_region<D>(display: &mut D, region: Rectangle) -> Result<(), D::Error>
where
    D: DrawTarget<Color = BinaryColor>,
{
    region
        .into_styled(PrimitiveStyle::with_fill(PAPER))
        .draw(display)
}

fn draw_atmospheric<D>(display: &mut D, model: &AtmosphericModel) -> Result<(), D::Error>
where
    D: DrawTarget<Color = BinaryColor>,
{
    clear_region(display, ATMOSPHERIC_REGION)?;
    draw_line(display, &text::temperature_line(model.temperature), TEMPERATURE_Y)?;
    draw_line(display, &text::humidity_line(model.humidity), HUMIDITY_Y)?;
    draw_line(display, &text::pressure_line(model.pressure), PRESSURE_Y)
}

fn draw_position<D>(display: &mut D, model: &LocationModel) -> Result<(), D::Error>
where
    D: DrawTarget<Color = BinaryColor>,
{
    clear_region(display, POSITION_REGION)?;
    draw_line(display, &text::latitude_line(model.latitude()), LATITUDE_Y)?;
    draw_line(display, &text::longitude_line(model.longitude()), LONGITUDE_Y)
}

fn draw_counter<D>(display: &mut D, count: u32) -> Result<(), D::Error>
where
    D: DrawTarget<Color = BinaryColor>,
{
    clear_region(display, COUNTER_REGION)?;
    Text::with_baseline(
        &text::counter_text(count),
        COUNTER_REGION.top_left,
        MonoTextStyle::new(&FONT_4X6, INK),
        Baseline::Top,
    )
    .draw(display)?;
    Ok(())
}

pub struct DisplayController<P: Panel> {
    panel: RefCell<P>,
    guard: RenderGuard,
    refreshes: Cell<u32>,
}

impl<P> DisplayController<P>
where
    P: Panel,
    P::Error: Debug,
{
    pub fn new(panel: P) -> Self {
        Self {
            panel: RefCell::new(panel),
            guard: RenderGuard::new(),
            refreshes: Cell::new(0),
        }
    }

    pub fn guard(&self) -> &RenderGuard {
        &self.guard
    }

    /// Borrow the panel. Panics if called from inside a render.
    pub fn panel(&self) -> Ref<'_, P> {
        self.panel.borrow()
    }

    /// Completed full updates so far.
    pub fn refresh_count(&self) -> u32 {
        self.refreshes.get()
    }

    fn render<F>(&self, what: &str, draw: F) -> RenderOutcome
    where
        F: FnOnce(&mut P) -> Result<(), P::Error>,
    {
        let Some(_pass) = self.guard.try_begin() else {
            debug!("Render in progress, skipping {} update", what);
            return RenderOutcome::Skipped;
        };

        let mut panel = self.panel.borrow_mut();
        match draw(&mut *panel).and_then(|()| panel.show()) {
            Ok(()) => RenderOutcome::Rendered,
            Err(e) => {
                error!("Display render error during {} update: {:?}", what, e);
                RenderOutcome::Failed
            }
        }
    }

    /// Clear the panel and draw the frame and static labels.
    pub fn draw_background(&self) -> RenderOutcome {
        self.render("background", |panel| {
            panel.clear(PAPER)?;
            FRAME
                .into_styled(PrimitiveStyle::with_stroke(INK, 1))
                .draw(panel)?;
            draw_line(panel, "Temp:", TEMPERATURE_Y)?;
            draw_line(panel, "Humidity:", HUMIDITY_Y)?;
            draw_line(panel, "Pressure:", PRESSURE_Y)?;
            draw_line(panel, "Lat:", LATITUDE_Y)?;
            draw_line(panel, "Lon:", LONGITUDE_Y)
        })
    }

    pub fn update_atmospheric(&self, model: &AtmosphericModel) -> RenderOutcome {
        self.render("atmospheric", |panel| draw_atmospheric(panel, model))
    }

    pub fn update_position(&self, model: &LocationModel) -> RenderOutcome {
        self.render("position", |panel| draw_position(panel, model))
    }

    /// Redraw every value and bump the refresh counter.
    pub fn update(&self, conditions: &CurrentConditions) -> RenderOutcome {
        let count = self.refreshes.get().wrapping_add(1);
        let outcome = self.render("full", |panel| {
            draw_atmospheric(panel, &conditions.atmospheric)?;
            draw_position(panel, &conditions.location)?;
            draw_counter(panel, count)
        });

        if outcome == RenderOutcome::Rendered {
            self.refreshes.set(count);
        }
        outcome
    }
}
