use std::cell::RefCell;
use std::rc::Rc;

use js_sys::{Object, Reflect, Uint8Array, WebAssembly};
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::JsFuture;
use web_sys::{Document, Element, HtmlCanvasElement, KeyboardEvent, MouseEvent, Response, WebGl2RenderingContext, Window};

use crate::config::HostConfig;
use crate::dom;
use crate::error::HostError;
use crate::frame::FrameDriver;
use crate::gpu::WebGlGpu;
use crate::host::Host;
use crate::input::{self, InputEvent};
use crate::memory::JsMemory;
use crate::module::{imports, JsModule, SimulationModule};
use crate::shader::ShaderRegistry;

type SharedHost = Rc<RefCell<Host<WebGlGpu, JsMemory>>>;

/// Bring the page up: GL context, shaders, scene, module, listeners, frame loop.
pub async fn run(config: HostConfig) -> Result<(), HostError> {
    let window = dom::window()?;
    let document = dom::document(&window)?;
    let canvas = dom::canvas(&document, &config.canvas_id)?;

    let gl = canvas
        .get_context("webgl2")
        .map_err(HostError::from_js)?
        .ok_or_else(|| HostError::Dom("WebGL2 not supported".to_string()))?
        .dyn_into::<WebGl2RenderingContext>()
        .map_err(|_| HostError::Dom("Context is not WebGL2".to_string()))?;

    let mut shaders = ShaderRegistry::with_builtins();
    dom::collect_shader_sources(&document, &config.shader_class, &mut shaders);

    let host: SharedHost = Rc::new(RefCell::new(Host::new(WebGlGpu::new(gl), shaders, &config)?));
    install_resize(&window, &canvas, &host)?;

    let imports = build_imports(&host)?;
    let instance = instantiate(&window, &config.module_url, &imports).await?;
    let module = Rc::new(JsModule::from_instance(&instance)?);
    host.borrow_mut().attach_memory(JsMemory::new(module.memory().clone()));
    log::info!("Loaded simulation module from {}", config.module_url);

    module.setup()?;

    install_input(&document, &module)?;
    start_frame_loop(window, dom::element(&document, &config.fps_element_id), module)?;
    Ok(())
}

fn set_import(target: &Object, name: &str, value: &JsValue) -> Result<(), HostError> {
    Reflect::set(target, &JsValue::from_str(name), value)
        .map(drop)
        .map_err(HostError::from_js)
}

/// The `env` imports. Errors returned from a callback are thrown into the
/// module, which aborts its current export call.
fn build_imports(host: &SharedHost) -> Result<Object, HostError> {
    let env = Object::new();

    let set_view_projection = {
        let host = Rc::clone(host);
        Closure::<dyn FnMut(u32) -> Result<(), JsValue>>::new(move |ptr: u32| {
            host.borrow_mut().set_view_projection(ptr).map_err(JsValue::from)
        })
    };
    set_import(&env, imports::SET_VIEW_PROJECTION, set_view_projection.as_ref())?;
    set_view_projection.forget();

    let upload_cloth_vertices = {
        let host = Rc::clone(host);
        Closure::<dyn FnMut(u32, u32, u32, u32) -> Result<(), JsValue>>::new(
            move |count: u32, positions: u32, colors: u32, normals: u32| {
                host.borrow_mut()
                    .upload_cloth_vertices(count, positions, colors, normals)
                    .map_err(JsValue::from)
            },
        )
    };
    set_import(&env, imports::UPLOAD_CLOTH_VERTICES, upload_cloth_vertices.as_ref())?;
    upload_cloth_vertices.forget();

    let draw_scene = {
        let host = Rc::clone(host);
        Closure::<dyn FnMut() -> Result<(), JsValue>>::new(move || {
            host.borrow_mut().draw_scene().map(drop).map_err(JsValue::from)
        })
    };
    set_import(&env, imports::DRAW_SCENE, draw_scene.as_ref())?;
    draw_scene.forget();

    let get_aspect = {
        let host = Rc::clone(host);
        Closure::<dyn Fn() -> f32>::new(move || host.borrow().aspect_ratio())
    };
    set_import(&env, imports::GET_ASPECT, get_aspect.as_ref())?;
    get_aspect.forget();

    let sin = Closure::<dyn Fn(f32) -> f32>::new(|x: f32| x.sin());
    set_import(&env, imports::SIN, sin.as_ref())?;
    sin.forget();

    let cos = Closure::<dyn Fn(f32) -> f32>::new(|x: f32| x.cos());
    set_import(&env, imports::COS, cos.as_ref())?;
    cos.forget();

    let root = Object::new();
    set_import(&root, imports::NAMESPACE, &env)?;
    Ok(root)
}

/// Fetch and instantiate the module, returning the `WebAssembly.Instance`.
async fn instantiate(window: &Window, url: &str, imports: &Object) -> Result<JsValue, HostError> {
    let response: Response = JsFuture::from(window.fetch_with_str(url))
        .await
        .map_err(HostError::from_js)?
        .dyn_into()
        .map_err(HostError::from_js)?;
    if !response.ok() {
        return Err(HostError::Js(format!(
            "Fetching {url} failed with status {}",
            response.status()
        )));
    }

    let buffer = JsFuture::from(response.array_buffer().map_err(HostError::from_js)?)
        .await
        .map_err(HostError::from_js)?;
    let bytes = Uint8Array::new(&buffer).to_vec();

    let source = JsFuture::from(WebAssembly::instantiate_buffer(&bytes, imports))
        .await
        .map_err(HostError::from_js)?;
    Reflect::get(&source, &JsValue::from_str("instance")).map_err(HostError::from_js)
}

fn install_resize(window: &Window, canvas: &HtmlCanvasElement, host: &SharedHost) -> Result<(), HostError> {
    let apply = {
        let window = window.clone();
        let canvas = canvas.clone();
        let host = Rc::clone(host);
        move || -> Result<(), HostError> {
            let viewport = dom::window_viewport(&window)?;
            dom::size_canvas(&canvas, viewport);
            host.borrow_mut().resize(viewport);
            Ok(())
        }
    };
    apply()?;

    let on_resize = Closure::<dyn FnMut()>::new(move || {
        if let Err(err) = apply() {
            log::error!("Resize failed: {err}");
        }
    });
    window
        .add_event_listener_with_callback("resize", on_resize.as_ref().unchecked_ref())
        .map_err(HostError::from_js)?;
    on_resize.forget();
    Ok(())
}

fn listen<E, F>(document: &Document, event: &str, module: &Rc<JsModule>, to_input: F) -> Result<(), HostError>
where
    E: JsCast + 'static,
    F: Fn(&E) -> InputEvent + 'static,
{
    let module = Rc::clone(module);
    let name = event.to_string();
    let handler = Closure::<dyn FnMut(web_sys::Event)>::new(move |event: web_sys::Event| {
        let Some(event) = event.dyn_ref::<E>() else { return };
        if let Err(err) = input::forward(module.as_ref(), &to_input(event)) {
            log::error!("Forwarding {name} failed: {err}");
        }
    });
    document
        .add_event_listener_with_callback(event, handler.as_ref().unchecked_ref())
        .map_err(HostError::from_js)?;
    handler.forget();
    Ok(())
}

fn install_input(document: &Document, module: &Rc<JsModule>) -> Result<(), HostError> {
    listen(document, "mousedown", module, |_: &MouseEvent| InputEvent::PointerDown)?;
    listen(document, "mouseup", module, |_: &MouseEvent| InputEvent::PointerUp)?;
    listen(document, "mouseleave", module, |_: &MouseEvent| InputEvent::PointerLeave)?;
    listen(document, "mousemove", module, |e: &MouseEvent| InputEvent::PointerMove {
        x: e.client_x() as f64,
        y: e.client_y() as f64,
    })?;
    listen(document, "keydown", module, |e: &KeyboardEvent| InputEvent::KeyDown(e.key()))?;
    Ok(())
}

type FrameCallback = Rc<RefCell<Option<Closure<dyn FnMut(f64)>>>>;

fn request_frame(window: &Window, callback: &FrameCallback) -> Result<(), HostError> {
    if let Some(closure) = callback.borrow().as_ref() {
        window
            .request_animation_frame(closure.as_ref().unchecked_ref())
            .map_err(HostError::from_js)?;
    }
    Ok(())
}

/// Drive the module from `requestAnimationFrame`. A failing frame is logged and
/// ends the loop, leaving the last rendered frame on screen.
fn start_frame_loop(window: Window, readout: Option<Element>, module: Rc<JsModule>) -> Result<(), HostError> {
    let callback: FrameCallback = Rc::new(RefCell::new(None));
    let next = Rc::clone(&callback);
    let loop_window = window.clone();
    let mut driver = FrameDriver::new();

    *callback.borrow_mut() = Some(Closure::<dyn FnMut(f64)>::new(move |timestamp: f64| {
        match driver.frame(module.as_ref(), timestamp) {
            Ok(text) => {
                if let Some(readout) = &readout {
                    readout.set_text_content(Some(&text));
                }
            }
            Err(err) => {
                log::error!("Frame failed, stopping: {err}");
                return;
            }
        }
        if let Err(err) = request_frame(&loop_window, &next) {
            log::error!("Could not schedule the next frame: {err}");
        }
    }));

    request_frame(&window, &callback)
}
