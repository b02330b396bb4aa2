// Copyright 2023-2024 Hugo Osvaldo Barrera
//
// SPDX-License-Identifier: EUPL-1.2

use std::path::PathBuf;

use anyhow::Context;
use davcore::storage::folder;
use davcore::{config, Application, DavRequest};
use http::{Method, Response};
use inquire::{InquireError, Select, Text};
use log::info;
use simple_logger::SimpleLogger;
use tokio::fs::File;

const PROPFIND: &str = "PROPFIND";
const DELETE: &str = "DELETE";
const QUIT: &str = "Quit";

fn print_response(response: &Response<String>) {
    println!("{:?} {}", response.version(), response.status());
    for (name, value) in response.headers() {
        println!("{name}: {}", value.to_str().unwrap_or("<binary>"));
    }
    println!();
    println!("{}", response.body());
}

/// Returns `None` if the user asked to stop.
fn prompt<T>(result: Result<T, InquireError>) -> anyhow::Result<Option<T>> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(InquireError::OperationCanceled | InquireError::OperationInterrupted) => Ok(None),
        Err(err) => Err(err.into()),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config_path = std::env::args().nth(1).map(PathBuf::from);
    let configuration =
        config::load(config_path.as_deref()).context("loading configuration")?;
    SimpleLogger::new()
        .with_level(configuration.logging.level)
        .init()
        .map_err(|err| anyhow::anyhow!("installing logger: {err}"))?;

    let folder = &configuration.storage.folder;
    let store = folder::load(folder)
        .with_context(|| format!("loading collections from {}", folder.display()))?;
    info!("Loaded collections from {}", folder.display());
    let app = Application::new(
        configuration.server.clone(),
        store,
        configuration.rights.backend,
        configuration.hook.backend,
    );

    loop {
        let Some(method) = prompt(Select::new("Method:", vec![PROPFIND, DELETE, QUIT]).prompt())?
        else {
            break;
        };
        if method == QUIT {
            break;
        }
        let Some(path) = prompt(Text::new("Path:").with_default("/").prompt())? else {
            break;
        };
        let Some(user) = prompt(Text::new("User (empty for anonymous):").prompt())? else {
            break;
        };

        let mut request = DavRequest::new(Method::from_bytes(method.as_bytes())?, path);
        if !user.is_empty() {
            request = request.user(user);
        }

        let response = if method == PROPFIND {
            let Some(depth) = prompt(Select::new("Depth:", vec!["0", "1", "infinity"]).prompt())?
            else {
                break;
            };
            let Some(body_file) =
                prompt(Text::new("Request body file (empty for allprop):").prompt())?
            else {
                break;
            };
            let request = request.depth(depth);
            if body_file.is_empty() {
                app.handle(request).await
            } else {
                let file = File::open(&body_file)
                    .await
                    .with_context(|| format!("opening request body {body_file}"))?;
                app.handle(request.with_body(file)).await
            }
        } else {
            let Some(if_match) = prompt(Text::new("If-Match:").with_default("*").prompt())? else {
                break;
            };
            let Some(context) = prompt(Text::new("Context (optional):").prompt())? else {
                break;
            };
            let mut request = request.if_match(if_match);
            if !context.is_empty() {
                request = request.context(context);
            }
            app.handle(request).await
        };
        print_response(&response);
    }

    Ok(())
}
