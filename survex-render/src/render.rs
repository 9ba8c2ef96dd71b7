use std::borrow::Cow;
use std::fmt::Write as _;

use survex_core::{MAX_AGE, MIN_AGE, Phase};

const STYLE: &str = r#"<style>
  body { font-family: sans-serif; margin: 0; }
  .block-container { padding: 1rem 5rem 0 5rem; }
  .columns { display: flex; gap: 2rem; }
  .columns > div { flex: 1; }
  .columns video { width: 100%; }
  .error { background: #fde8e8; color: #8a1c1c; padding: 0.75rem 1rem; border-radius: 6px; }
  .participant-form { background-color: #FFFFE0; padding: 20px; border-radius: 10px; }
  fieldset { border: none; padding: 0; }
</style>"#;

/// Keeps Enter in a text field from submitting the form early.
const BLOCK_ENTER_JS: &str = r#"<script>
  window.addEventListener('keydown', function (e) {
    if (e.key === 'Enter' && e.target.nodeName === 'INPUT' && e.target.type === 'text') {
      e.preventDefault();
    }
  });
</script>"#;

const CONSENT_JS: &str = r#"<script>
  (function () {
    var box = document.getElementById('consent');
    var start = document.getElementById('start');
    box.addEventListener('change', function () { start.disabled = !box.checked; });
  })();
</script>"#;

/// What the active trial needs on screen
#[derive(Debug, Clone)]
pub struct TrialView {
    pub index: usize,
    pub heading: String,
    pub video_url: String,
}

/// Everything a page needs besides the phase itself
#[derive(Debug, Clone, Default)]
pub struct PageView<'a> {
    pub trial: Option<TrialView>,
    pub choices: &'a [String],
    pub error: Option<&'a str>,
    pub consent_given: bool,
    /// A record (delivered or not) exists and can be downloaded.
    pub can_download: bool,
}

pub trait PhaseRenderer<P: Phase> {
    fn render_phase(&self, phase: &P, view: &PageView<'_>) -> String;
}

pub struct HtmlRenderer {
    title: String,
    instructions: String,
}

impl HtmlRenderer {
    pub fn new(title: &str, trial_count: usize) -> Self {
        Self {
            title: escape(title).into_owned(),
            instructions: Self::render_instructions(trial_count),
        }
    }

    fn render_instructions(trial_count: usize) -> String {
        format!(
            r#"<h2>Welcome to the experiment.</h2>
<p><strong>Please read the following instructions carefully:</strong></p>
<ol>
  <li>Press the button to begin the experiment.</li>
  <li>Watch the video presented.</li>
  <li>Select the most appropriate option from the list provided below the video.</li>
  <li>The video will only play once, so please ensure you watch it attentively.</li>
  <li>There are {trial_count} videos, and you must choose an option for each video.</li>
  <li>Click on the play button to play the video.</li>
  <li>For optimal visualization, we recommend using a laptop, MacBook, or iPad.</li>
  <li>The experiment may take 5-10 minutes, so please proceed patiently.</li>
</ol>"#
        )
    }

    fn page(&self, body: &str, error: Option<&str>) -> String {
        let mut out = String::with_capacity(body.len() + 2048);
        let _ = write!(
            out,
            "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n\
             <meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">\n\
             <title>{}</title>\n{}\n</head>\n<body>\n<div class=\"block-container\">\n",
            self.title, STYLE
        );
        if let Some(message) = error {
            let _ = writeln!(out, "<p class=\"error\" role=\"alert\">{}</p>", escape(message));
        }
        out.push_str(body);
        out.push_str("\n</div>\n");
        out.push_str(BLOCK_ENTER_JS);
        out.push_str("\n</body>\n</html>\n");
        out
    }

    fn welcome(&self, view: &PageView<'_>) -> String {
        let checked = if view.consent_given { " checked" } else { "" };
        let disabled = if view.consent_given { "" } else { " disabled" };
        format!(
            r#"{}
<form method="post" action="/start">
  <label><input type="checkbox" id="consent" name="consent" value="on"{checked}> <strong>I understand that my data is being collected.</strong></label>
  <p><button type="submit" id="start"{disabled}>Start Experiment</button></p>
</form>
{CONSENT_JS}"#,
            self.instructions
        )
    }

    fn trial(&self, view: &PageView<'_>) -> String {
        // Missing media: only the error banner is shown and nothing can be submitted.
        let Some(trial) = &view.trial else {
            return String::new();
        };
        let mut radios = String::new();
        for (i, label) in view.choices.iter().enumerate() {
            let label = escape(label);
            let checked = if i == 0 { " checked" } else { "" };
            let _ = writeln!(
                radios,
                r#"    <label><input type="radio" name="choice" value="{label}"{checked}> {label}</label><br>"#
            );
        }
        format!(
            r#"<h3>{heading}</h3>
<div class="columns">
  <div>
    <video src="{src}" controls preload="auto" controlslist="nodownload"></video>
  </div>
  <div>
    <form method="post" action="/choice">
      <fieldset>
        <legend>Select the most appropriate option:</legend>
{radios}      </fieldset>
      <input type="hidden" name="trial" value="{index}">
      <button type="submit">Next</button>
    </form>
  </div>
</div>"#,
            heading = escape(&trial.heading),
            src = escape(&trial.video_url),
            index = trial.index,
        )
    }

    fn participant_form(&self, view: &PageView<'_>) -> String {
        let download = if view.can_download {
            "\n<p>Your answers could not be sent yet. You can still download them, then submit again.</p>\n<p><a href=\"/responses.csv\" download>Download responses as CSV</a></p>"
        } else {
            ""
        };
        format!(
            r#"<h3>Please fill out the following form:</h3>
<p>Please fill all the entries before clicking on submit button.</p>
<form method="post" action="/participant" class="participant-form">
  <p><label>Participant's Name <input type="text" name="name" value=""></label></p>
  <p><label>Age of the Participant <input type="number" name="age" min="{MIN_AGE}" max="{MAX_AGE}" step="1" value="0" required></label></p>
  <fieldset>
    <legend>Do you wear spectacles?</legend>
    <label><input type="radio" name="spectacles" value="Yes" checked> Yes</label>
    <label><input type="radio" name="spectacles" value="No"> No</label>
  </fieldset>
  <p><button type="submit">Submit</button></p>
</form>{download}"#
        )
    }

    fn completed(&self) -> String {
        r#"<h3>Thank you for taking part.</h3>
<p><a href="/responses.csv" download>Download responses as CSV</a></p>
<form method="post" action="/restart">
  <button type="submit">Start over</button>
</form>"#
            .to_string()
    }
}

impl<P: Phase> PhaseRenderer<P> for HtmlRenderer {
    fn render_phase(&self, phase: &P, view: &PageView<'_>) -> String {
        let body = match phase {
            p if p.is_welcome() => self.welcome(view),
            p if p.is_trial() => self.trial(view),
            p if p.awaits_form() => self.participant_form(view),
            p if p.is_complete() => self.completed(),
            _ => String::new(),
        };
        self.page(&body, view.error)
    }
}

pub fn escape(s: &str) -> Cow<'_, str> {
    if !s.contains(['&', '<', '>', '"', '\'']) {
        return Cow::Borrowed(s);
    }
    let mut out = String::with_capacity(s.len() + 16);
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    Cow::Owned(out)
}

/// Percent-encodes each `/`-separated segment of a relative media path.
pub fn media_url(prefix: &str, relative: &str) -> String {
    let mut out = String::from(prefix.trim_end_matches('/'));
    for segment in relative.split('/') {
        out.push('/');
        for b in segment.bytes() {
            if b.is_ascii_alphanumeric() || matches!(b, b'-' | b'_' | b'.' | b'~') {
                out.push(b as char);
            } else {
                let _ = write!(out, "%{b:02X}");
            }
        }
    }
    out
}
