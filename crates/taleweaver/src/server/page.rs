//! Server-rendered HTML for the web UI.

use std::fmt::Write;

use base64::Engine;
use taleweaver_core::{SamplingParameters, StoryOutcome, UploadedImage};

const TITLE: &str = "Turn the Image into Audio/Text Story";

const STYLE: &str = r#"
body { font-family: system-ui, sans-serif; margin: 0; display: flex; min-height: 100vh; }
aside { width: 18rem; padding: 1.5rem; background: #f0f2f6; }
main { flex: 1; padding: 2rem 3rem; max-width: 48rem; }
label { display: block; margin-top: 1rem; font-size: 0.9rem; }
input[type=range] { width: 100%; }
output { font-weight: 600; }
button { margin-top: 1.5rem; padding: 0.5rem 1.25rem; }
img.upload { max-width: 100%; border-radius: 0.5rem; }
pre.story { white-space: pre-wrap; font-family: inherit; }
.busy { display: none; margin-top: 1rem; color: #0068c9; }
.error { color: #b00020; }
"#;

/// Escape text for HTML element and attribute content.
pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}

fn layout(body: &str) -> String {
    format!(
        "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n\
         <meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">\n\
         <title>{TITLE}</title>\n<style>{STYLE}</style>\n</head>\n<body>\n{body}\n</body>\n</html>\n"
    )
}

fn slider(name: &str, label: &str, value: String, min: String, max: String, step: &str) -> String {
    format!(
        "<label for=\"{name}\">{label}: <output id=\"{name}-value\">{value}</output></label>\n\
         <input type=\"range\" id=\"{name}\" name=\"{name}\" form=\"story-form\" \
         min=\"{min}\" max=\"{max}\" step=\"{step}\" value=\"{value}\" \
         oninput=\"document.getElementById('{name}-value').value = this.value\">\n"
    )
}

fn sidebar(sampling: &SamplingParameters) -> String {
    let (k_min, k_max) = SamplingParameters::TOP_K_RANGE;
    let (p_min, p_max) = SamplingParameters::TOP_P_RANGE;
    let (t_min, t_max) = SamplingParameters::TEMPERATURE_RANGE;

    let mut html = String::from("<aside>\n<h3>LLM Inference Configuration Parameters</h3>\n");
    html.push_str(&slider(
        "top_k",
        "Top-K",
        sampling.top_k.to_string(),
        k_min.to_string(),
        k_max.to_string(),
        "1",
    ));
    html.push_str(&slider(
        "top_p",
        "Top-P",
        sampling.top_p.to_string(),
        p_min.to_string(),
        p_max.to_string(),
        "0.01",
    ));
    html.push_str(&slider(
        "temperature",
        "Temperature",
        sampling.temperature.to_string(),
        t_min.to_string(),
        t_max.to_string(),
        "0.01",
    ));
    html.push_str("</aside>\n");
    html
}

fn upload_form() -> String {
    "<form id=\"story-form\" method=\"post\" action=\"/story\" enctype=\"multipart/form-data\" \
     onsubmit=\"document.getElementById('busy').style.display = 'block'\">\n\
     <label for=\"image\">Upload an image...</label>\n\
     <input type=\"file\" id=\"image\" name=\"image\" accept=\".jpg,.jpeg,.png\" required>\n\
     <button type=\"submit\">Tell me a story</button>\n\
     <div id=\"busy\" class=\"busy\">AI is at Work!</div>\n\
     </form>\n"
        .to_string()
}

/// Landing page: upload form plus sampling sliders.
pub fn index_page(defaults: &SamplingParameters) -> String {
    let body = format!(
        "{}<main>\n<h1>{TITLE}</h1>\n{}</main>",
        sidebar(defaults),
        upload_form()
    );
    layout(&body)
}

/// Results page for one finished run.
pub fn result_page(outcome: &StoryOutcome, upload: &UploadedImage, audio_url: &str) -> String {
    let preview = base64::engine::general_purpose::STANDARD.encode(&upload.bytes);

    let mut main = format!("<main>\n<h1>{TITLE}</h1>\n{}", upload_form());
    let _ = write!(
        main,
        "<img class=\"upload\" alt=\"Uploaded Image\" src=\"data:{};base64,{preview}\">\n\
         <details open><summary>Image Caption</summary><p>{}</p></details>\n\
         <details open><summary>Story</summary><pre class=\"story\">{}</pre></details>\n\
         <h3>Audio Story</h3>\n<audio controls src=\"{}\"></audio>\n</main>",
        upload.kind.mime_type(),
        escape(&outcome.caption),
        escape(&outcome.story),
        escape(audio_url),
    );

    layout(&format!("{}{main}", sidebar(&outcome.sampling)))
}

/// Error page; nothing from a failed run is shown.
pub fn error_page(status: u16, message: &str, defaults: &SamplingParameters) -> String {
    let body = format!(
        "{}<main>\n<h1>{TITLE}</h1>\n{}\
         <p class=\"error\"><strong>Error {status}</strong>: {}</p>\n</main>",
        sidebar(defaults),
        upload_form(),
        escape(message)
    );
    layout(&body)
}
