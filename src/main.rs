//! Bubble Quest entry point
//!
//! On wasm this is the browser host: canvas setup, listeners, the
//! animation-frame loop and teardown. Natively it runs a short scripted
//! session headless, as a smoke test.

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;

#[cfg(target_arch = "wasm32")]
mod wasm_host {
    use std::cell::RefCell;
    use std::rc::{Rc, Weak};

    use glam::Vec2;
    use wasm_bindgen::prelude::*;
    use web_sys::{
        CanvasRenderingContext2d, Document, Event, EventTarget, HtmlCanvasElement, KeyboardEvent,
        MouseEvent,
    };

    use bubble_quest::content::{ContentLibrary, ContentMode};
    use bubble_quest::game::modal::Modal;
    use bubble_quest::game::progression::PhilosophyAnswer;
    use bubble_quest::platform;
    use bubble_quest::render::CanvasSurface;
    use bubble_quest::{Game, GameEvent, Settings, Tuning};

    /// A registered DOM listener, kept so it can be removed again
    struct Listener {
        target: EventTarget,
        kind: &'static str,
        closure: Closure<dyn FnMut(Event)>,
    }

    struct Host {
        game: Game,
        surface: CanvasSurface,
        canvas: HtmlCanvasElement,
        document: Document,
        raf_id: Option<i32>,
        listeners: Vec<Listener>,
        /// Detached listeners, freed with the host
        retired: Vec<Listener>,
        destroyed: bool,
    }

    impl Host {
        fn tick(&mut self, time: f64) {
            self.game.frame(time);
            self.game.draw(&mut self.surface, time);
            for event in self.game.drain_events() {
                self.present(event);
            }
        }

        /// Mirror game events into the page
        fn present(&mut self, event: GameEvent) {
            match event {
                GameEvent::ModalOpened(modal) => {
                    let text = modal_text(&self.game, &modal);
                    self.set_text("modal-body", &text);
                    self.set_class("modal", "");
                }
                GameEvent::ModalClosed(_) => {
                    if self.game.active_modal().is_none() {
                        self.set_class("modal", "hidden");
                    }
                }
                GameEvent::XpGained { .. }
                | GameEvent::LevelUp { .. }
                | GameEvent::LifeLost { .. }
                | GameEvent::Restarted => self.update_hud(),
                GameEvent::YearAdvanced { year } => {
                    self.set_text("hud-year", &year.to_string());
                }
                other => log::debug!("{:?}", other),
            }
        }

        fn update_hud(&self) {
            let session = self.game.session();
            self.set_text("hud-xp", &session.xp.to_string());
            self.set_text("hud-level", &session.level.to_string());
            self.set_text("hud-lives", &session.lives.to_string());
        }

        fn set_text(&self, id: &str, text: &str) {
            if let Some(el) = self.document.get_element_by_id(id) {
                el.set_text_content(Some(text));
            }
        }

        fn set_class(&self, id: &str, class: &str) {
            if let Some(el) = self.document.get_element_by_id(id) {
                let _ = el.set_attribute("class", class);
            }
        }

        /// Match the backing store to the element and re-init the game
        fn resize(&mut self) {
            let (w, h) = client_size(&self.canvas);
            self.canvas.set_width(w);
            self.canvas.set_height(h);
            self.game.resize(w as f32, h as f32, platform::now_ms());
        }

        fn handle_key(&mut self, event: &KeyboardEvent) {
            let now = platform::now_ms();
            let key = event.key();
            let result = match key.as_str() {
                "Escape" | "Enter" | " " => self.game.close_modal(now),
                "b" => {
                    let level = match self.game.active_modal() {
                        Some(Modal::LevelUp(level_up)) => Some(level_up.new_level),
                        _ => None,
                    };
                    level.map_or(Ok(()), |level| self.game.open_bonus(level))
                }
                "r" if self.game.session().game_completed => {
                    self.game.restart();
                    Ok(())
                }
                digit => match digit.parse::<usize>() {
                    Ok(n) if n > 0 => self
                        .game
                        .answer_question(PhilosophyAnswer::Option(n - 1))
                        .and_then(|_| self.game.close_modal(now)),
                    _ => Ok(()),
                },
            };
            if let Err(e) = result {
                log::debug!("Key {:?} ignored: {}", key, e);
            }
        }

        /// Single exit path: frame loop, listeners, simulation
        fn destroy(&mut self) {
            if self.destroyed {
                return;
            }
            if let (Some(id), Some(window)) = (self.raf_id.take(), web_sys::window()) {
                let _ = window.cancel_animation_frame(id);
            }
            for listener in &self.listeners {
                let _ = listener.target.remove_event_listener_with_callback(
                    listener.kind,
                    listener.closure.as_ref().unchecked_ref(),
                );
            }
            // The closure running this teardown may be one of them; move
            // them aside instead of dropping mid-call
            self.retired.append(&mut self.listeners);
            self.game.destroy();
            self.destroyed = true;
            log::info!("Host torn down");
        }
    }

    fn client_size(canvas: &HtmlCanvasElement) -> (u32, u32) {
        (
            canvas.client_width().max(1) as u32,
            canvas.client_height().max(1) as u32,
        )
    }

    fn modal_text(game: &Game, modal: &Modal) -> String {
        match modal {
            Modal::Welcome => "Welcome! Click the bubbles to explore.".to_string(),
            Modal::BubbleDetail { bubble_id } => game
                .content()
                .bubble(*bubble_id)
                .map(|b| format!("{}\n{}", b.name, b.description))
                .unwrap_or_default(),
            Modal::PhilosophyQuestion { question_id, .. } => game
                .content()
                .question(*question_id)
                .map(|q| {
                    let options: Vec<String> = q
                        .options
                        .iter()
                        .enumerate()
                        .map(|(i, o)| format!("{}. {}", i + 1, o.text))
                        .collect();
                    format!("{}\n{}", q.question, options.join("\n"))
                })
                .unwrap_or_default(),
            Modal::Achievement(a) => format!("{} (+{} XP)\n{}", a.title, a.xp, a.description),
            Modal::LevelUp(level_up) => {
                let title = level_up
                    .level_data
                    .as_ref()
                    .map(|d| d.title.as_str())
                    .unwrap_or_default();
                format!("Level {}: {}", level_up.new_level, title)
            }
            Modal::GameOver => format!(
                "Game over at level {} with {} XP. Press R to restart.",
                game.session().level,
                game.session().xp
            ),
            Modal::Bonus(bonus) => bonus.title.clone(),
        }
    }

    /// Content is normalized upstream and embedded in the page as JSON
    fn load_content(document: &Document) -> ContentLibrary {
        let Some(json) = document
            .get_element_by_id("bubble-content")
            .and_then(|el| el.text_content())
        else {
            log::warn!("No bubble content in page");
            return ContentLibrary::default();
        };
        ContentLibrary::from_json(&json).unwrap_or_else(|e| {
            log::error!("Content rejected: {}", e);
            ContentLibrary::default()
        })
    }

    fn listen<F>(host: &Rc<RefCell<Host>>, target: &EventTarget, kind: &'static str, mut handler: F)
    where
        F: FnMut(&mut Host, Event) + 'static,
    {
        let weak: Weak<RefCell<Host>> = Rc::downgrade(host);
        let closure = Closure::<dyn FnMut(Event)>::new(move |event: Event| {
            if let Some(host) = weak.upgrade() {
                handler(&mut host.borrow_mut(), event);
            }
        });
        if target
            .add_event_listener_with_callback(kind, closure.as_ref().unchecked_ref())
            .is_err()
        {
            log::warn!("Could not listen for {}", kind);
            return;
        }
        host.borrow_mut().listeners.push(Listener {
            target: target.clone(),
            kind,
            closure,
        });
    }

    fn pointer(event: &Event) -> Option<Vec2> {
        event
            .dyn_ref::<MouseEvent>()
            .map(|e| Vec2::new(e.offset_x() as f32, e.offset_y() as f32))
    }

    fn setup_listeners(host: &Rc<RefCell<Host>>, window: &web_sys::Window) {
        let (canvas, document) = {
            let h = host.borrow();
            (h.canvas.clone(), h.document.clone())
        };

        listen(host, &canvas, "pointermove", |h, event| {
            if let Some(point) = pointer(&event) {
                h.game.handle_pointer_move(point, platform::now_ms());
            }
        });
        listen(host, &canvas, "pointerleave", |h, _| h.game.handle_pointer_leave());
        listen(host, &canvas, "click", |h, event| {
            if let Some(point) = pointer(&event) {
                h.game.handle_click(point, platform::now_ms());
            }
        });
        listen(host, window, "resize", |h, _| h.resize());
        listen(host, &document, "keydown", |h, event| {
            if let Some(key) = event.dyn_ref::<KeyboardEvent>() {
                h.handle_key(key);
            }
        });
        if let Some(button) = document.get_element_by_id("modal-close") {
            listen(host, &button, "click", |h, _| {
                if let Err(e) = h.game.close_modal(platform::now_ms()) {
                    log::debug!("Close ignored: {}", e);
                }
            });
        }
        if let Some(button) = document.get_element_by_id("restart") {
            listen(host, &button, "click", |h, _| h.game.restart());
        }
        listen(host, window, "pagehide", |h, _| h.destroy());
    }

    fn request_frame(callback: &Closure<dyn FnMut(f64)>) -> Option<i32> {
        web_sys::window()?
            .request_animation_frame(callback.as_ref().unchecked_ref())
            .ok()
    }

    fn start_loop(host: &Rc<RefCell<Host>>) {
        let frame: Rc<RefCell<Option<Closure<dyn FnMut(f64)>>>> = Rc::new(RefCell::new(None));
        let next = frame.clone();
        let weak = Rc::downgrade(host);

        *frame.borrow_mut() = Some(Closure::new(move |time: f64| {
            let Some(host) = weak.upgrade() else {
                let _ = next.borrow_mut().take();
                return;
            };
            let mut h = host.borrow_mut();
            if h.destroyed {
                // Drops this closure and the cycle through `next`
                let _ = next.borrow_mut().take();
                return;
            }
            h.tick(time);
            h.raf_id = next.borrow().as_ref().and_then(request_frame);
        }));

        let id = frame.borrow().as_ref().and_then(request_frame);
        host.borrow_mut().raf_id = id;
    }

    pub fn run() -> Result<(), JsValue> {
        console_error_panic_hook::set_once();
        if console_log::init_with_level(log::Level::Info).is_err() {
            web_sys::console::warn_1(&"Logger already initialized".into());
        }
        log::info!("Bubble Quest starting...");

        let window = web_sys::window().ok_or("no window")?;
        let document = window.document().ok_or("no document")?;
        let canvas: HtmlCanvasElement = document
            .get_element_by_id("canvas")
            .ok_or("no canvas")?
            .dyn_into()?;
        let (w, h) = client_size(&canvas);
        canvas.set_width(w);
        canvas.set_height(h);

        let ctx: CanvasRenderingContext2d = canvas
            .get_context("2d")?
            .ok_or("no 2d context")?
            .dyn_into()?;

        let settings = Settings::load();
        let seed = js_sys::Date::now() as u64;
        let game = Game::new(
            load_content(&document),
            Tuning::default(),
            &settings,
            ContentMode::Career,
            w as f32,
            h as f32,
            seed,
        )
        .map_err(|e| JsValue::from_str(&e.to_string()))?;
        log::info!("Game initialized with seed: {}", seed);

        let host = Rc::new(RefCell::new(Host {
            game,
            surface: CanvasSurface::new(ctx),
            canvas,
            document,
            raf_id: None,
            listeners: Vec::new(),
            retired: Vec::new(),
            destroyed: false,
        }));
        host.borrow().update_hud();

        setup_listeners(&host, &window);
        start_loop(&host);

        // Listeners and the frame loop only hold weak references
        std::mem::forget(host);
        Ok(())
    }
}

#[cfg(target_arch = "wasm32")]
#[wasm_bindgen(start)]
pub fn wasm_main() -> Result<(), JsValue> {
    wasm_host::run()
}

#[cfg(target_arch = "wasm32")]
fn main() {
    // WASM entry point is wasm_main, this is just to satisfy the compiler
}

#[cfg(not(target_arch = "wasm32"))]
fn main() {
    env_logger::init();
    log::info!("Bubble Quest (native) starting...");
    log::info!("Native mode runs headless - use `trunk serve` for the web version");

    let quality = std::env::args()
        .nth(1)
        .and_then(|arg| bubble_quest::QualityPreset::from_str(&arg))
        .unwrap_or_default();
    match headless::run(bubble_quest::Settings::from_preset(quality)) {
        Ok(summary) => println!("{}", summary),
        Err(e) => {
            log::error!("Headless session failed: {}", e);
            std::process::exit(1);
        }
    }
}

#[cfg(not(target_arch = "wasm32"))]
mod headless {
    use glam::Vec2;

    use bubble_quest::consts::FRAME_MS;
    use bubble_quest::content::{ContentLibrary, ContentMode};
    use bubble_quest::game::modal::Modal;
    use bubble_quest::game::progression::PhilosophyAnswer;
    use bubble_quest::render::{Color, Surface};
    use bubble_quest::{Game, GameError, Settings, Tuning};

    const DEMO_CONTENT: &str = r#"{
        "bubbles": [
            {"id": 1, "name": "Rust", "year": 2022, "skillLevel": "expert"},
            {"id": 2, "name": "SQL", "year": 2022, "skillLevel": "confident"},
            {"id": 3, "name": "WebAssembly", "year": 2023, "skillLevel": "intermediate"},
            {"id": 4, "name": "Canvas", "year": 2023},
            {"id": 5, "name": "Physics", "year": 2024, "skillLevel": "master"}
        ],
        "questions": [
            {"id": 1, "question": "Ship early or ship polished?", "options": [
                {"text": "Early", "agreementLevel": 1.0},
                {"text": "Never ship", "agreementLevel": -1.0, "livesLost": 1}
            ]}
        ]
    }"#;

    /// Counts draw calls instead of drawing
    #[derive(Default)]
    struct CountingSurface {
        calls: usize,
    }

    impl Surface for CountingSurface {
        fn clear(&mut self, _width: f32, _height: f32, _color: Color) {
            self.calls += 1;
        }
        fn save(&mut self) {}
        fn restore(&mut self) {}
        fn translate(&mut self, _offset: Vec2) {}
        fn fill_circle(&mut self, _center: Vec2, _radius: f32, _color: Color) {
            self.calls += 1;
        }
        fn fill_radial_gradient(&mut self, _c: Vec2, _r: f32, _inner: Color, _outer: Color) {
            self.calls += 1;
        }
        fn stroke_circle(&mut self, _c: Vec2, _r: f32, _w: f32, _color: Color) {
            self.calls += 1;
        }
        fn fill_text(&mut self, _text: &str, _pos: Vec2, _size: f32, _color: Color) {
            self.calls += 1;
        }
    }

    /// Click through every bubble, answering questions agreeably
    pub fn run(settings: Settings) -> Result<String, GameError> {
        let content = ContentLibrary::from_json(DEMO_CONTENT)?;
        let mut game = Game::new(
            content,
            Tuning::default(),
            &settings,
            ContentMode::Career,
            960.0,
            640.0,
            7,
        )?;
        let mut surface = CountingSurface::default();
        let mut now = 0.0;

        for frame in 0..3000u32 {
            now += FRAME_MS;
            game.frame(now);
            game.draw(&mut surface, now);
            game.drain_events();

            if frame % 20 != 0 {
                continue;
            }
            if let Some(modal) = game.active_modal().cloned() {
                if matches!(modal, Modal::PhilosophyQuestion { .. }) {
                    game.answer_question(PhilosophyAnswer::Option(0))?;
                }
                game.close_modal(now)?;
                continue;
            }
            let target = game
                .scene()
                .nodes()
                .iter()
                .find(|n| !n.is_visited && !n.is_popped)
                .map(|n| n.pos);
            if let Some(pos) = target {
                game.handle_click(pos, now);
            }
        }

        let session = game.session();
        Ok(format!(
            "level {} | {} XP | {} lives | year {:?} | {} achievements | {} draw calls",
            session.level,
            session.xp,
            session.lives,
            session.current_year,
            game.achievements().unlocked().count(),
            surface.calls
        ))
    }
}
