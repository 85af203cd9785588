//! WASM API
//!
//! JavaScript-facing entry points. Errors cross the boundary as strings.

use wasm_bindgen::prelude::*;

use crate::converters::{convert_musicxml_to_mnx_string, ConversionSettings};

/// Convert MusicXML text to MNX JSON text
///
/// # Parameters
/// - `xml`: MusicXML document, partwise or timewise
/// - `settings`: optional object with `mnx_version`, `include_beams`, `pretty`
#[wasm_bindgen(js_name = convertMusicXMLToMNX)]
pub fn convert_musicxml_to_mnx_js(xml: &str, settings: JsValue) -> Result<String, JsValue> {
    let settings = parse_settings(settings)?;

    convert_musicxml_to_mnx_string(xml, Some(settings)).map_err(|e| {
        log::error!("convertMusicXMLToMNX failed: {}", e);
        JsValue::from_str(&e.to_string())
    })
}

fn parse_settings(settings: JsValue) -> Result<ConversionSettings, JsValue> {
    if settings.is_undefined() || settings.is_null() {
        return Ok(ConversionSettings::default());
    }
    serde_wasm_bindgen::from_value(settings)
        .map_err(|e| JsValue::from_str(&format!("Invalid settings: {}", e)))
}
