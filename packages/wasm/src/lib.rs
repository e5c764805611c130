//! JSON-in/JSON-out bindings for the browser editor and renderer.
//!
//! Every export parses its arguments, calls into the engine and serializes
//! the result; failures come back to JavaScript as error strings.

use cord_common::{expand, flatten_with, FlatMap, Value};
use cord_editor::{
    apply_change, compute_change_request_inverse, flatten_options, should_accept, ChangePayload,
    ChangeReport, ChangeRequest, ContentSection, ProjectContents, SystemClock,
};
use cord_evaluator::{merge_overrides, SymbolDefinition, SymbolInstance};
use serde::de::DeserializeOwned;
use serde::Serialize;
use wasm_bindgen::prelude::*;

#[wasm_bindgen(start)]
pub fn init() {
    console_error_panic_hook::set_once();
}

#[derive(Serialize)]
struct AppliedRequest<'a> {
    contents: &'a ProjectContents,
    report: &'a ChangeReport,
}

fn parse<T: DeserializeOwned>(json: &str, what: &str) -> Result<T, String> {
    serde_json::from_str(json).map_err(|e| format!("Invalid {}: {}", what, e))
}

fn to_json<T: Serialize>(value: &T) -> Result<String, String> {
    serde_json::to_string(value).map_err(|e| format!("Serialization error: {}", e))
}

fn apply_change_json(section: &str, payload: &str) -> Result<String, String> {
    let section: ContentSection = parse(section, "content section")?;
    let payload: ChangePayload = parse(payload, "change payload")?;

    let next = apply_change(&payload, &section).map_err(|e| format!("Apply error: {}", e))?;
    to_json(&next)
}

fn apply_change_request_json(contents: &str, request: &str) -> Result<String, String> {
    let mut contents: ProjectContents = parse(contents, "project contents")?;
    let request: ChangeRequest = parse(request, "change request")?;

    let report = contents
        .apply_change_request(&request)
        .map_err(|e| format!("Apply error: {}", e))?;
    to_json(&AppliedRequest {
        contents: &contents,
        report: &report,
    })
}

fn invert_change_request_json(contents: &str, request: &str) -> Result<String, String> {
    let contents: ProjectContents = parse(contents, "project contents")?;
    let request: ChangeRequest = parse(request, "change request")?;

    let inverse = compute_change_request_inverse(&request, &contents, &SystemClock)
        .map_err(|e| format!("Invert error: {}", e))?;
    to_json(&inverse)
}

fn should_accept_json(contents: &str, request: &str) -> Result<bool, String> {
    let contents: ProjectContents = parse(contents, "project contents")?;
    let request: ChangeRequest = parse(request, "change request")?;
    Ok(should_accept(&request, &contents))
}

fn merge_overrides_json(instance: &str, definition: &str) -> Result<String, String> {
    let instance: SymbolInstance = parse(instance, "symbol instance")?;
    let definition: SymbolDefinition = parse(definition, "symbol definition")?;

    let merged =
        merge_overrides(&instance, &definition).map_err(|e| format!("Merge error: {}", e))?;
    to_json(&merged)
}

fn flatten_json(update: &str) -> Result<String, String> {
    let update: Value = parse(update, "update")?;
    to_json(&flatten_with(&update, &flatten_options()))
}

fn expand_json(flat: &str, filter_nulls: bool) -> Result<String, String> {
    let flat: FlatMap = parse(flat, "flat map")?;
    to_json(&expand(&flat, filter_nulls))
}

/// Apply one payload to a content section, returning the new section
#[wasm_bindgen(js_name = applyChange)]
pub fn apply_change_js(section: &str, payload: &str) -> Result<String, JsValue> {
    apply_change_json(section, payload).map_err(|e| JsValue::from_str(&e))
}

/// Apply a change request; returns `{ contents, report }`
#[wasm_bindgen(js_name = applyChangeRequest)]
pub fn apply_change_request_js(contents: &str, request: &str) -> Result<String, JsValue> {
    apply_change_request_json(contents, request).map_err(|e| JsValue::from_str(&e))
}

/// Request that undoes `request`, computed against the contents it was applied to
#[wasm_bindgen(js_name = invertChangeRequest)]
pub fn invert_change_request_js(contents: &str, request: &str) -> Result<String, JsValue> {
    invert_change_request_json(contents, request).map_err(|e| JsValue::from_str(&e))
}

#[wasm_bindgen(js_name = shouldAccept)]
pub fn should_accept_js(contents: &str, request: &str) -> Result<bool, JsValue> {
    should_accept_json(contents, request).map_err(|e| JsValue::from_str(&e))
}

#[wasm_bindgen(js_name = mergeOverrides)]
pub fn merge_overrides_js(instance: &str, definition: &str) -> Result<String, JsValue> {
    merge_overrides_json(instance, definition).map_err(|e| JsValue::from_str(&e))
}

#[wasm_bindgen(js_name = flatten)]
pub fn flatten_js(update: &str) -> Result<String, JsValue> {
    flatten_json(update).map_err(|e| JsValue::from_str(&e))
}

#[wasm_bindgen(js_name = expand)]
pub fn expand_js(flat: &str, filter_nulls: bool) -> Result<String, JsValue> {
    expand_json(flat, filter_nulls).map_err(|e| JsValue::from_str(&e))
}
