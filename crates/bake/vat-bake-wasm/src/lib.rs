use js_sys::{Float32Array, Object, Reflect};
use serde::Serialize;
use serde_wasm_bindgen as swb;
use wasm_bindgen::prelude::*;

use vat_bake_core::{bake, BakeConfig, BakeOutput, BakeStatus, SceneDescription};

#[wasm_bindgen]
pub struct VatBaker {
    config: BakeConfig,
}

fn jsvalue_is_undefined_or_null(v: &JsValue) -> bool {
    v.is_undefined() || v.is_null()
}

fn set(target: &Object, key: &str, value: &JsValue) -> Result<(), JsError> {
    Reflect::set(target, &JsValue::from_str(key), value)
        .map(|_| ())
        .map_err(|e| JsError::new(&format!("output error on {key}: {e:?}")))
}

fn to_js<T: Serialize>(key: &str, value: &T) -> Result<JsValue, JsError> {
    value
        .serialize(&swb::Serializer::json_compatible())
        .map_err(|e| JsError::new(&format!("{key} serialization error: {e}")))
}

/// `{ report, layout, bounds, uvs, offsets, normals }`, with both buffers as
/// `Float32Array`s.
fn output_to_js(out: &BakeOutput) -> Result<JsValue, JsError> {
    let obj = Object::new();
    set(&obj, "report", &to_js("report", &out.report)?)?;
    set(&obj, "layout", &to_js("layout", &out.layout)?)?;
    set(&obj, "bounds", &to_js("bounds", &out.bounds)?)?;
    set(&obj, "uvs", &to_js("uvs", &out.uvs)?)?;
    set(&obj, "offsets", &Float32Array::from(out.offsets.as_slice()).into())?;
    set(&obj, "normals", &Float32Array::from(out.normals.as_slice()).into())?;
    Ok(obj.into())
}

#[wasm_bindgen]
impl VatBaker {
    /// Create a baker. Pass a (partial) BakeConfig object or undefined/null for
    /// defaults.
    /// Example:
    ///   new VatBaker({ layout: { max_width: 2048 }, encode: { remap_offsets: true } })
    #[wasm_bindgen(constructor)]
    pub fn new(config: JsValue) -> Result<VatBaker, JsError> {
        console_error_panic_hook::set_once();

        let cfg: BakeConfig = if jsvalue_is_undefined_or_null(&config) {
            BakeConfig::default()
        } else {
            swb::from_value(config).map_err(|e| JsError::new(&format!("config error: {e}")))?
        };
        cfg.validate().map_err(|e| JsError::new(&e.to_string()))?;

        Ok(VatBaker { config: cfg })
    }

    /// Current configuration as a JS object.
    pub fn config(&self) -> Result<JsValue, JsError> {
        to_js("config", &self.config)
    }

    /// Bake a scene description object (`{ kind: "animation", objects }` or
    /// `{ kind: "mesh_sequence", meshes }`).
    pub fn bake(&self, scene: JsValue) -> Result<JsValue, JsError> {
        if jsvalue_is_undefined_or_null(&scene) {
            return Err(JsError::new("bake: scene is null/undefined"));
        }
        let scene: SceneDescription = swb::from_value(scene)
            .map_err(|e| JsError::new(&format!("bake scene parse error: {e}")))?;
        self.bake_scene(scene)
    }

    /// Same as `bake`, from a JSON string.
    #[wasm_bindgen(js_name = bake_json)]
    pub fn bake_json(&self, scene_json: &str) -> Result<JsValue, JsError> {
        let scene = SceneDescription::from_json(scene_json)
            .map_err(|e| JsError::new(&format!("bake scene parse error: {e}")))?;
        self.bake_scene(scene)
    }

    /// Bake and return `{ success, message }` instead of throwing.
    #[wasm_bindgen(js_name = bake_status)]
    pub fn bake_status(&self, scene_json: &str) -> Result<JsValue, JsError> {
        let result = SceneDescription::from_json(scene_json)
            .and_then(SceneDescription::into_input)
            .and_then(|input| bake(&input, &self.config));
        to_js("status", &BakeStatus::from_result(&result))
    }
}

impl VatBaker {
    fn bake_scene(&self, scene: SceneDescription) -> Result<JsValue, JsError> {
        let input = scene
            .into_input()
            .map_err(|e| JsError::new(&e.to_string()))?;
        let out = bake(&input, &self.config).map_err(|e| JsError::new(&e.to_string()))?;
        output_to_js(&out)
    }
}

/// Numeric ABI version for compatibility checks at init.
#[wasm_bindgen]
pub fn abi_version() -> u32 {
    1
}
