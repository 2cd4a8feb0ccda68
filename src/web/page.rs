//! The single demo page. Server-side rendering is limited to one
//! decision: when the input video is absent the page carries only the
//! error line, otherwise the full demo body plus the polling script.

const PAGE_SHELL: &str = r#"<!doctype html>
<html lang="en">
<head>
<meta charset="utf-8">
<title>Parking Spot Detection on Video</title>
<style>
body { font-family: sans-serif; max-width: 48rem; margin: 2rem auto; padding: 0 1rem; }
.player, #live-frame { width: 100%; }
progress { width: 100%; height: 1rem; }
.error { color: #b00020; }
.success { color: #1a7f37; }
button { padding: 0.5rem 1rem; font-size: 1rem; }
</style>
</head>
<body>
<h1>Parking Spot Detection on Video</h1>
%BODY%
</body>
</html>
"#;

const DEMO_BODY: &str = r#"<h2>Original Video</h2>
<video class="player" src="/video/original" controls></video>
<p><button id="run-btn">Run Parking Spot Detection</button></p>
<p id="run-error" class="error" hidden></p>
<p id="info" hidden>Processing video... this may take some time depending on length.</p>
<img id="live-frame" alt="Current frame" hidden>
<progress id="progress" value="0" max="1" hidden></progress>
<p id="success" class="success" hidden>Video processing completed!</p>
<div id="processed" hidden>
<h2>Processed Video with Bounding Boxes</h2>
<video id="processed-video" class="player" controls></video>
<p><a href="/download" download="processed_video.mp4">Download Processed Video</a></p>
</div>
"#;

const SCRIPT: &str = r#"<script>
const btn = document.getElementById('run-btn');
const info = document.getElementById('info');
const runError = document.getElementById('run-error');
const live = document.getElementById('live-frame');
const bar = document.getElementById('progress');
const success = document.getElementById('success');
const processed = document.getElementById('processed');
let timer = null;

btn.addEventListener('click', async () => {
  const resp = await fetch('/run', { method: 'POST' });
  if (!resp.ok) {
    const body = await resp.json().catch(() => ({}));
    runError.textContent = body.error === 'already_running'
      ? 'A run is already in progress.'
      : 'Could not start the run.';
    runError.hidden = false;
    return;
  }
  runError.hidden = true;
  success.hidden = true;
  processed.hidden = true;
  info.hidden = false;
  live.hidden = false;
  bar.hidden = false;
  bar.value = 0;
  timer = setInterval(poll, 400);
});

async function poll() {
  const resp = await fetch('/status');
  if (!resp.ok) {
    return;
  }
  const status = await resp.json();
  bar.value = status.progress;
  if (status.phase === 'running') {
    live.src = '/frame?t=' + Date.now();
  } else if (status.phase === 'done') {
    clearInterval(timer);
    info.hidden = true;
    success.hidden = false;
    processed.hidden = false;
    document.getElementById('processed-video').src = '/video/processed?t=' + Date.now();
  } else if (status.phase === 'failed') {
    clearInterval(timer);
    info.hidden = true;
    runError.textContent = status.error || 'Processing failed.';
    runError.hidden = false;
  }
}
</script>
"#;

pub fn render(video_path: &str, video_available: bool) -> String {
    let body = if video_available {
        format!("{DEMO_BODY}{SCRIPT}")
    } else {
        format!(
            "<p class=\"error\">Video file {} not found in working directory.</p>\n",
            escape_html(video_path)
        )
    };
    PAGE_SHELL.replace("%BODY%", &body)
}

fn escape_html(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_page_carries_demo_sections() {
        let html = render("parking.mp4", true);
        assert!(html.contains("Parking Spot Detection on Video"));
        assert!(html.contains("Original Video"));
        assert!(html.contains("Run Parking Spot Detection"));
        assert!(html.contains("Processing video... this may take some time depending on length."));
        assert!(html.contains("Video processing completed!"));
        assert!(html.contains("Processed Video with Bounding Boxes"));
        assert!(html.contains("Download Processed Video"));
        assert!(!html.contains("not found in working directory"));
    }

    #[test]
    fn missing_video_page_is_error_only() {
        let html = render("parking.mp4", false);
        assert!(html.contains(
            "Video file parking.mp4 not found in working directory."
        ));
        assert!(!html.contains("Run Parking Spot Detection"));
        assert!(!html.contains("Original Video"));
    }

    #[test]
    fn video_path_is_html_escaped() {
        let html = render("<clip>&.mp4", false);
        assert!(html.contains("&lt;clip&gt;&amp;.mp4"));
        assert!(!html.contains("<clip>"));
    }
}
