use super::controller::{Focus, ImageArea, Panel, UiController, UiState, MAX_WORDS, MIN_WORDS, PLACEHOLDER_PROMPT};

const STYLE: &str = r#"
    * { margin: 0; padding: 0; box-sizing: border-box; }
    body {
        font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, sans-serif;
        background: linear-gradient(135deg, #667eea 0%, #764ba2 100%);
        min-height: 100vh;
        display: flex;
        align-items: center;
        justify-content: center;
        padding: 20px;
    }
    main {
        background: white;
        border-radius: 20px;
        box-shadow: 0 20px 60px rgba(0,0,0,0.3);
        max-width: 720px;
        width: 100%;
        padding: 40px;
        display: flex;
        flex-direction: column;
        gap: 20px;
    }
    .flex-column { display: flex; flex-direction: column; align-items: center; gap: 10px; }
    #image-input-area {
        width: 100%;
        border: 3px dashed #667eea;
        border-radius: 15px;
        padding: 40px 20px;
        background: #f8f9ff;
        color: #667eea;
        font-size: 1.1em;
        cursor: pointer;
    }
    #image-input-area.drag-over { border-color: #764ba2; background: #e8ebff; }
    #image-input-area:disabled { cursor: not-allowed; opacity: 0.6; }
    .upload-icon { font-size: 3em; }
    .uploaded-img { max-width: 100%; max-height: 360px; border-radius: 10px; }
    #description-length-container.disabled { opacity: 0.5; }
    #description-output-area { width: 100%; min-height: 120px; padding: 12px; border-radius: 10px; }
    .buttons { display: flex; gap: 10px; }
    button { padding: 10px 18px; border-radius: 20px; border: 2px solid #667eea; background: #f8f9ff; color: #667eea; font-weight: 600; }
    button:disabled { opacity: 0.5; }
    #copy-button.copied { border-color: #2e9e5b; color: #2e9e5b; }
    #copy-button.failed { border-color: #c33; color: #c33; }
    #loading-section, #error-section { align-items: center; justify-content: center; gap: 12px; }
    #error-section { background: #fee; border: 2px solid #fcc; color: #c33; padding: 15px; border-radius: 10px; }
    .spinner {
        border: 4px solid #f3f3f3;
        border-top: 4px solid #667eea;
        border-radius: 50%;
        width: 50px;
        height: 50px;
        animation: spin 1s linear infinite;
    }
    @keyframes spin { 0% { transform: rotate(0deg); } 100% { transform: rotate(360deg); } }
"#;

// Forwards clicks, drops and picker changes into the upload form.
const SCRIPT: &str = r#"
    const imageInputArea = document.getElementById('image-input-area');
    const fileInput = document.getElementById('file-input');
    const imageForm = document.getElementById('image-form');
    const lengthInput = document.getElementById('description-length-input');
    const lengthText = document.getElementById('description-length-text');

    imageInputArea.addEventListener('click', () => fileInput.click());
    imageInputArea.addEventListener('dragover', (e) => {
        e.preventDefault();
        imageInputArea.classList.add('drag-over');
    });
    imageInputArea.addEventListener('dragleave', () => imageInputArea.classList.remove('drag-over'));
    imageInputArea.addEventListener('drop', (e) => {
        e.preventDefault();
        imageInputArea.classList.remove('drag-over');
        if (imageInputArea.disabled) return;
        const file = e.dataTransfer.files[0];
        if (file && file.type.startsWith('image/')) {
            fileInput.files = e.dataTransfer.files;
            imageForm.submit();
        }
    });
    fileInput.addEventListener('change', () => {
        if (fileInput.files.length > 0) imageForm.submit();
    });
    lengthInput.addEventListener('input', () => {
        lengthText.textContent = `Description Length: ${lengthInput.value} Words`;
    });
"#;

pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

fn flag(on: bool, attribute: &str) -> &str {
    if on {
        attribute
    } else {
        ""
    }
}

fn display(visible: bool) -> &'static str {
    if visible {
        "flex"
    } else {
        "none"
    }
}

/// Renders the whole page from the controller.
pub fn render(ui: &UiController) -> String {
    let controls = ui.controls();
    let feedback = ui.copy_feedback();

    // The page polls while something is about to change server-side.
    let refresh = if ui.state() == UiState::Loading {
        r#"<meta http-equiv="refresh" content="1">"#
    } else if feedback.class().is_some() {
        r#"<meta http-equiv="refresh" content="3">"#
    } else {
        ""
    };

    let image_inner = match ui.image_area() {
        ImageArea::Placeholder => format!(
            r#"<span class="upload-icon" aria-hidden="true">📸</span>
                    <p>{PLACEHOLDER_PROMPT}</p>"#
        ),
        ImageArea::Image(handle) => format!(
            r#"<img src="{}" class="flex-column uploaded-img" alt="Uploaded image">"#,
            escape_html(&handle.local_url)
        ),
    };

    let copy_class = feedback.class().unwrap_or("");

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    {refresh}
    <title>Image Describer</title>
    <style>{STYLE}</style>
</head>
<body>
<main>
    <h1>Image Describer</h1>

    <form id="image-form" action="/image" method="post" enctype="multipart/form-data">
        <button type="button" id="image-input-area" class="flex-column" {image_disabled} {image_focus}>
                    {image_inner}
        </button>
        <input type="file" id="file-input" name="file" accept="image/*" hidden>
    </form>

    <form id="description-length-container" class="{length_class}" action="/length" method="post">
        <label id="description-length-text" for="description-length-input">{readout}</label>
        <input type="range" id="description-length-input" name="max_words" min="{MIN_WORDS}" max="{MAX_WORDS}" value="{max_words}" onchange="this.form.submit()" {length_disabled}>
    </form>

    <section id="description-content" class="flex-column" style="display: {content_display}">
        <textarea id="description-output-area" readonly {output_disabled}>{description}</textarea>
        <div class="buttons">
            <button type="submit" id="describe-button" form="description-length-container" formaction="/describe" {describe_disabled}>Describe</button>
            <form action="/copy" method="post">
                <button type="submit" id="copy-button" class="{copy_class}" {copy_disabled} {copy_focus}>{copy_label}</button>
            </form>
            <form action="/clear" method="post">
                <button type="submit" id="clear-button" {clear_disabled}>Clear</button>
            </form>
        </div>
    </section>

    <section id="loading-section" class="flex-column" style="display: {loading_display}">
        <div class="spinner"></div>
        <p>Describing your image...</p>
    </section>

    <section id="error-section" class="flex-column" style="display: {error_display}">
        <p id="error-message">{error_message}</p>
        <form action="/dismiss" method="post">
            <button type="submit" id="dismiss-error-button">Dismiss</button>
        </form>
    </section>
</main>
<script>{SCRIPT}</script>
</body>
</html>
"#,
        image_disabled = flag(!controls.image_area, "disabled"),
        image_focus = flag(ui.focus() == Focus::ImageArea, "autofocus"),
        length_class = flag(!controls.length, "disabled"),
        readout = ui.length_readout(),
        max_words = ui.max_words(),
        length_disabled = flag(!controls.length, "disabled"),
        content_display = display(ui.panel() == Panel::Content),
        output_disabled = flag(!controls.output, "disabled"),
        description = escape_html(ui.description()),
        describe_disabled = flag(!controls.describe, "disabled"),
        copy_disabled = flag(!controls.copy, "disabled"),
        copy_focus = flag(ui.focus() == Focus::CopyButton, "autofocus"),
        copy_label = feedback.label(),
        clear_disabled = flag(!controls.clear, "disabled"),
        loading_display = display(ui.panel() == Panel::Loading),
        error_display = display(ui.panel() == Panel::Error),
        error_message = escape_html(ui.error_message().unwrap_or("")),
    )
}
