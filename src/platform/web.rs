//! Browser binding
//!
//! Drives a `ParticleField` from requestAnimationFrame, two setInterval
//! timers and the window resize event. Particles are `<div>` children of the
//! background container, styled by the page's own CSS for the fade animation.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use glam::Vec2;
use rand_pcg::Pcg32;
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use web_sys::{Document, Element, Event, HtmlElement, Window};

use super::{CancelToken, FrameScheduler, Surface, run_until_cancelled};
use crate::error::FieldError;
use crate::settings::FieldSettings;
use crate::sim::{BatchStart, Particle, ParticleField, Viewport};

#[inline]
fn px(value: f32) -> String {
    format!("{}px", value)
}

/// Current viewport from the window globals
pub fn read_viewport(window: &Window) -> Viewport {
    let width = window.inner_width().ok().and_then(|v| v.as_f64()).unwrap_or(0.0);
    let height = window.inner_height().ok().and_then(|v| v.as_f64()).unwrap_or(0.0);
    Viewport::new(width as f32, height as f32, window.device_pixel_ratio())
}

/// Run `callback` once the DOM is parsed (immediately if it already is)
pub fn on_page_ready(callback: impl FnOnce() + 'static) -> Result<(), FieldError> {
    let window = web_sys::window().ok_or(FieldError::NoWindow)?;
    let document = window.document().ok_or(FieldError::NoDocument)?;

    if document.ready_state() != "loading" {
        callback();
        return Ok(());
    }

    let closure = Closure::once_into_js(move |_event: Event| callback());
    document.add_event_listener_with_callback("DOMContentLoaded", closure.unchecked_ref())?;
    Ok(())
}

/// Particle elements inside the background container
pub struct DomSurface {
    document: Document,
    container: Element,
    class_name: String,
}

impl DomSurface {
    pub fn new(document: Document, container: Element, class_name: String) -> Self {
        Self {
            document,
            container,
            class_name,
        }
    }

    fn set_geometry(element: &HtmlElement, size: f32, pos: Vec2) -> Result<(), JsValue> {
        let style = element.style();
        style.set_property("width", &px(size))?;
        style.set_property("height", &px(size))?;
        style.set_property("left", &px(pos.x))?;
        style.set_property("top", &px(pos.y))?;
        Ok(())
    }
}

impl Surface for DomSurface {
    type Handle = HtmlElement;

    fn attach(&mut self, particle: &Particle) -> Result<HtmlElement, FieldError> {
        let element: HtmlElement = self
            .document
            .create_element("div")?
            .dyn_into()
            .map_err(|_| FieldError::Dom("created div is not an HtmlElement".to_string()))?;

        element.class_list().add_1(&self.class_name)?;
        Self::set_geometry(&element, particle.size(), particle.pos)?;

        let style = element.style();
        style.set_property("animation-delay", &format!("{}s", particle.animation_delay))?;
        style.set_property(
            "animation-duration",
            &format!("{}s", particle.animation_duration),
        )?;

        self.container.append_child(&element)?;
        Ok(element)
    }

    fn apply(&mut self, handle: &HtmlElement, size: f32, pos: Vec2) {
        if let Err(e) = Self::set_geometry(handle, size, pos) {
            log::warn!("Failed to update particle element: {:?}", e);
        }
    }

    fn release(&mut self, handle: HtmlElement) {
        handle.remove();
    }
}

/// requestAnimationFrame-backed scheduler
pub struct AnimationFrameScheduler {
    window: Window,
}

impl AnimationFrameScheduler {
    pub fn new(window: Window) -> Self {
        Self { window }
    }
}

impl FrameScheduler for AnimationFrameScheduler {
    fn request_frame(&self, callback: Box<dyn FnOnce(f64)>) {
        let closure = Closure::once_into_js(move |time: f64| callback(time));
        if let Err(e) = self.window.request_animation_frame(closure.unchecked_ref()) {
            log::warn!("requestAnimationFrame failed: {:?}", e);
        }
    }
}

/// A running setInterval timer, cleared on drop.
///
/// `cancel` may be called from inside the timer's own callback; dropping it
/// there may not, so owners cancel first and drop later.
pub struct Interval {
    window: Window,
    handle: i32,
    active: Cell<bool>,
    _callback: Closure<dyn FnMut()>,
}

impl Interval {
    pub fn start(
        window: &Window,
        period_ms: u32,
        callback: impl FnMut() + 'static,
    ) -> Result<Self, FieldError> {
        let callback = Closure::<dyn FnMut()>::new(callback);
        let handle = window.set_interval_with_callback_and_timeout_and_arguments_0(
            callback.as_ref().unchecked_ref(),
            period_ms.min(i32::MAX as u32) as i32,
        )?;
        Ok(Self {
            window: window.clone(),
            handle,
            active: Cell::new(true),
            _callback: callback,
        })
    }

    pub fn is_active(&self) -> bool {
        self.active.get()
    }

    pub fn cancel(&self) {
        if self.active.replace(false) {
            self.window.clear_interval_with_handle(self.handle);
        }
    }
}

impl Drop for Interval {
    fn drop(&mut self) {
        self.cancel();
    }
}

/// A window event listener, removed on drop
pub struct EventListener {
    window: Window,
    event: &'static str,
    callback: Closure<dyn FnMut(Event)>,
}

impl EventListener {
    pub fn new(
        window: &Window,
        event: &'static str,
        callback: impl FnMut(Event) + 'static,
    ) -> Result<Self, FieldError> {
        let callback = Closure::<dyn FnMut(Event)>::new(callback);
        window.add_event_listener_with_callback(event, callback.as_ref().unchecked_ref())?;
        Ok(Self {
            window: window.clone(),
            event,
            callback,
        })
    }
}

impl Drop for EventListener {
    fn drop(&mut self) {
        let _ = self
            .window
            .remove_event_listener_with_callback(self.event, self.callback.as_ref().unchecked_ref());
    }
}

type DomField = ParticleField<Pcg32, DomSurface>;

/// State reachable from timer callbacks (through `Weak`)
struct Shared {
    window: Window,
    field: RefCell<DomField>,
    sub_tick: RefCell<Option<Interval>>,
}

impl Shared {
    fn on_frame(&self) {
        self.field.borrow_mut().tick(js_sys::Date::now());
    }

    fn on_batch_tick(shared: &Rc<Shared>) {
        let start = shared.field.borrow_mut().begin_batch();
        // Merged batches ride on the sub-tick timer already running
        if start != BatchStart::Started {
            return;
        }

        let period = shared.field.borrow().settings().sub_tick_interval_ms;
        let weak = Rc::downgrade(shared);
        let timer = Interval::start(&shared.window, period, move || {
            if let Some(shared) = weak.upgrade() {
                shared.on_sub_tick();
            }
        });

        match timer {
            // Replaces the previous (already cancelled) sub-tick timer
            Ok(timer) => *shared.sub_tick.borrow_mut() = Some(timer),
            Err(e) => {
                log::warn!("Failed to start batch distribution: {}", e);
                shared.field.borrow_mut().cancel_batch();
            }
        }
    }

    fn on_sub_tick(&self) {
        let mut field = self.field.borrow_mut();
        field.spawn_sub_tick(js_sys::Date::now());
        if !field.is_distributing() {
            if let Some(timer) = self.sub_tick.borrow().as_ref() {
                timer.cancel();
            }
        }
    }

    fn on_resize(&self) {
        let viewport = read_viewport(&self.window);
        self.field.borrow_mut().resize(viewport);
    }
}

/// The particle background attached to a page container.
///
/// Construct once the DOM is ready, then `start`. `stop` (or dropping the
/// effect) cancels the frame loop, clears both timers, detaches the resize
/// listener and removes every particle element.
pub struct BackgroundEffect {
    shared: Rc<Shared>,
    token: Option<CancelToken>,
    batch_timer: Option<Interval>,
    resize_listener: Option<EventListener>,
}

impl BackgroundEffect {
    pub fn new(settings: FieldSettings) -> Result<Self, FieldError> {
        settings.validate()?;
        let window = web_sys::window().ok_or(FieldError::NoWindow)?;
        let document = window.document().ok_or(FieldError::NoDocument)?;
        let container = document
            .query_selector(&settings.container_selector)?
            .ok_or_else(|| FieldError::ContainerNotFound(settings.container_selector.clone()))?;

        let settings = FieldSettings::from_container(&container, settings);
        let seed = settings.seed.unwrap_or_else(|| js_sys::Date::now() as u64);
        let viewport = read_viewport(&window);
        let surface = DomSurface::new(document, container, settings.particle_class.clone());
        let field = ParticleField::seeded(settings, viewport, surface, seed)?;

        log::info!(
            "Particle field ready: {}x{} px, {:.1} cm², batch {}, seed {}",
            viewport.width,
            viewport.height,
            field.area_cm2(),
            field.batch_size(),
            seed
        );

        Ok(Self {
            shared: Rc::new(Shared {
                window,
                field: RefCell::new(field),
                sub_tick: RefCell::new(None),
            }),
            token: None,
            batch_timer: None,
            resize_listener: None,
        })
    }

    pub fn is_running(&self) -> bool {
        self.token.is_some()
    }

    pub fn particle_count(&self) -> usize {
        self.shared.field.borrow().len()
    }

    pub fn start(&mut self) -> Result<(), FieldError> {
        if self.is_running() {
            return Ok(());
        }
        let shared = &self.shared;
        let created = shared.field.borrow_mut().populate(js_sys::Date::now());

        let batch_period = shared.field.borrow().settings().batch_interval_ms;
        let weak = Rc::downgrade(shared);
        let batch_timer = Interval::start(&shared.window, batch_period, move || {
            if let Some(shared) = weak.upgrade() {
                Shared::on_batch_tick(&shared);
            }
        })?;

        let weak = Rc::downgrade(shared);
        let resize_listener = EventListener::new(&shared.window, "resize", move |_event| {
            if let Some(shared) = weak.upgrade() {
                shared.on_resize();
            }
        })?;

        let token = CancelToken::new();
        let scheduler = Rc::new(AnimationFrameScheduler::new(shared.window.clone()));
        let weak = Rc::downgrade(shared);
        run_until_cancelled(scheduler, token.clone(), move |_frame_time| {
            if let Some(shared) = weak.upgrade() {
                shared.on_frame();
            }
        });

        self.batch_timer = Some(batch_timer);
        self.resize_listener = Some(resize_listener);
        self.token = Some(token);
        log::info!("Particle field started with {} particles", created);
        Ok(())
    }

    pub fn stop(&mut self) {
        let Some(token) = self.token.take() else {
            return;
        };
        token.cancel();
        self.batch_timer = None;
        self.resize_listener = None;
        self.shared.sub_tick.borrow_mut().take();
        self.shared.field.borrow_mut().clear();
        log::info!("Particle field stopped");
    }
}

impl Drop for BackgroundEffect {
    fn drop(&mut self) {
        self.stop();
    }
}

/// JS-facing handle for pages that manage the effect themselves
#[wasm_bindgen]
pub struct ParticleBackground {
    effect: BackgroundEffect,
}

#[wasm_bindgen]
impl ParticleBackground {
    /// Create the effect, optionally with a JSON settings object
    #[wasm_bindgen(constructor)]
    pub fn new(settings_json: Option<String>) -> Result<ParticleBackground, JsValue> {
        let settings = match settings_json {
            Some(json) => FieldSettings::from_json(&json),
            None => Ok(FieldSettings::default()),
        };
        let effect = settings
            .and_then(BackgroundEffect::new)
            .map_err(|e| JsValue::from_str(&e.to_string()))?;
        Ok(Self { effect })
    }

    pub fn start(&mut self) -> Result<(), JsValue> {
        self.effect
            .start()
            .map_err(|e| JsValue::from_str(&e.to_string()))
    }

    pub fn stop(&mut self) {
        self.effect.stop();
    }

    #[wasm_bindgen(getter, js_name = particleCount)]
    pub fn particle_count(&self) -> usize {
        self.effect.particle_count()
    }
}
