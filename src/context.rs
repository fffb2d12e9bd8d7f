use std::process::Stdio;
use std::time::Duration;

use tokio::process::Command;
use tokio::sync::oneshot;
use tracing::debug;

use crate::config::ProjectConfig;
use crate::event::ProjectContext;

const XCODE_VERSION_TIMEOUT: Duration = Duration::from_secs(2);

/// Discover the project context in the background
pub fn spawn(project: ProjectConfig) -> oneshot::Receiver<ProjectContext> {
    let (tx, rx) = oneshot::channel();
    tokio::spawn(async move {
        let mut context = from_config(&project);
        context.xcode_version = xcode_version().await;
        let _ = tx.send(context);
    });
    rx
}

/// Context fields known without running anything
pub fn from_config(project: &ProjectConfig) -> ProjectContext {
    let name = project.name();
    ProjectContext {
        project: if name.is_empty() { "(auto)".to_string() } else { name },
        scheme: project.scheme.clone(),
        configuration: project.configuration.clone(),
        destination: project.destination.clone(),
        system: format!("{}/{}", std::env::consts::OS, std::env::consts::ARCH),
        xcode_version: None,
    }
}

async fn xcode_version() -> Option<String> {
    let run = Command::new("xcodebuild")
        .arg("-version")
        .stdin(Stdio::null())
        .stderr(Stdio::null())
        .kill_on_drop(true)
        .output();
    let output = match tokio::time::timeout(XCODE_VERSION_TIMEOUT, run).await {
        Ok(Ok(output)) if output.status.success() => output,
        Ok(Ok(_)) => return None,
        Ok(Err(err)) => {
            debug!(error = %err, "xcodebuild -version unavailable");
            return None;
        }
        Err(_) => {
            debug!("xcodebuild -version timed out");
            return None;
        }
    };
    first_line(&String::from_utf8_lossy(&output.stdout))
}

fn first_line(text: &str) -> Option<String> {
    text.lines()
        .map(str::trim)
        .find(|l| !l.is_empty())
        .map(str::to_string)
}
