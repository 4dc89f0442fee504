/// MV3D terminal viewer
///
/// Usage:
///   mv3d-viewer                      show the empty-viewer placeholder
///   mv3d-viewer model.stl            upload to the server, then view it
///   mv3d-viewer http://host/models/x.stl   view a served model directly
///   mv3d-viewer --server http://host:3100 model.stl
use std::path::Path;

use anyhow::{bail, Result};
use tracing::error;
use tracing_subscriber::EnvFilter;

use mv3d_viewer::client::{self, UploadStatus};
use mv3d_viewer::ViewerApp;

const DEFAULT_SERVER: &str = "http://localhost:3100";

fn main() -> Result<()> {
    // Raw-mode drawing owns stdout; logs go to stderr and stay quiet
    // unless MV3D_LOG asks for more
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_env("MV3D_LOG").unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();

    let mut server = DEFAULT_SERVER.to_string();
    let mut input: Option<String> = None;

    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--server" => match args.next() {
                Some(url) => server = url,
                None => bail!("--server requires a URL"),
            },
            "--help" | "-h" => {
                print_usage();
                return Ok(());
            }
            _ if input.is_none() => input = Some(arg),
            other => bail!("unexpected argument: {other}"),
        }
    }

    let mut app = ViewerApp::from_terminal()?;

    match input {
        None => {
            app.notices_mut().warn("No file selected");
        }
        Some(target) if is_url(&target) => {
            app.open(&target);
        }
        Some(path) => {
            // Local file: upload first, then view the served copy
            match client::upload_model(&server, Path::new(&path)) {
                Ok(outcome) => {
                    match outcome.status {
                        UploadStatus::Created => {
                            app.notices_mut()
                                .info(format!("Uploaded {}", outcome.filename));
                        }
                        UploadStatus::AlreadyExists => {
                            app.notices_mut().warn(format!(
                                "{} already exists on server, opening existing copy",
                                outcome.filename
                            ));
                        }
                    }
                    app.open(&outcome.file_path);
                }
                Err(err) => {
                    error!("upload failed: {err}");
                    app.notices_mut().error("Upload failed");
                }
            }
        }
    }

    app.run()?;
    Ok(())
}

fn is_url(target: &str) -> bool {
    target.starts_with("http://") || target.starts_with("https://")
}

fn print_usage() {
    println!("mv3d-viewer [--server URL] [model.stl | http://host/models/x.stl]");
    println!();
    println!("Controls: drag=rotate, shift+drag=pan, scroll=zoom, o=export OBJ, q=quit");
}
