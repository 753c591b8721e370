//! Fetching the raw resources of a build from Jenkins.
//!
//! The three requests are independent of each other, so they are sent
//! concurrently from worker threads and joined before anything is decoded.
//! The first failure is returned right away; the workers still in flight
//! are abandoned and their results dropped.

use anyhow::{anyhow, Context};
use log::debug;
use reqwest::blocking::Client;
use std::{sync::mpsc, thread};

use crate::{constants::APP_USER_AGENT, BuildEndpoints, ReportConfig, Resource};

/// Response bodies of a build, read fully into memory.
#[derive(Debug, Default, Clone)]
pub(crate) struct BuildBodies {
    pub(crate) metadata: Vec<u8>,
    pub(crate) console: Vec<u8>,
    pub(crate) environment: Vec<u8>,
}

fn fetch_body(client: &Client, url: &str) -> anyhow::Result<Vec<u8>> {
    debug!("fetching {url}");
    let body = client
        .get(url)
        .send()?
        .error_for_status()?
        .bytes()?
        .to_vec();
    debug!("fetched {} bytes from {url}", body.len());
    Ok(body)
}

impl ReportConfig {
    fn client(&self) -> anyhow::Result<Client> {
        let client = Client::builder()
            .user_agent(APP_USER_AGENT)
            .timeout(self.timeout)
            .build()?;
        Ok(client)
    }

    /// Fetches all resources of the build, failing on the first error
    /// (transport error, non-success status or interrupted body).
    pub(crate) fn fetch_bodies(&self, endpoints: &BuildEndpoints) -> anyhow::Result<BuildBodies> {
        let client = self.client()?;
        let (tx, rx) = mpsc::channel();
        for resource in Resource::ALL {
            let client = client.clone();
            let url = endpoints.url(resource).to_string();
            let tx = tx.clone();
            thread::spawn(move || {
                let body = fetch_body(&client, &url).with_context(|| {
                    format!("could not fetch the {} from {url}", resource.description())
                });
                // the receiver is gone if another request failed first
                let _ = tx.send((resource, body));
            });
        }
        drop(tx);

        let (mut metadata, mut console, mut environment) = (None, None, None);
        for (resource, body) in rx {
            let body = body?;
            match resource {
                Resource::Metadata => metadata = Some(body),
                Resource::Console => console = Some(body),
                Resource::Environment => environment = Some(body),
            }
        }
        let missing = |resource: Resource| {
            anyhow!(
                "the request for the {} ended without a response",
                resource.description()
            )
        };
        Ok(BuildBodies {
            metadata: metadata.ok_or_else(|| missing(Resource::Metadata))?,
            console: console.ok_or_else(|| missing(Resource::Console))?,
            environment: environment.ok_or_else(|| missing(Resource::Environment))?,
        })
    }
}

/// Serves canned responses on a random local port, returning its base url.
/// Paths without a route get a 404.
#[cfg(test)]
pub(crate) fn serve(routes: Vec<(String, u16, Vec<u8>)>) -> String {
    serve_slowly(routes, std::time::Duration::ZERO)
}

/// Like [`serve`], but holds back every response body for `delay`.
#[cfg(test)]
fn serve_slowly(routes: Vec<(String, u16, Vec<u8>)>, delay: std::time::Duration) -> String {
    use std::io::{BufRead, BufReader, Write};
    use std::net::TcpListener;
    use std::sync::Arc;

    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    let routes = Arc::new(routes);
    thread::spawn(move || {
        for stream in listener.incoming() {
            let Ok(mut stream) = stream else {
                continue;
            };
            let routes = Arc::clone(&routes);
            thread::spawn(move || {
                let mut reader = BufReader::new(stream.try_clone().unwrap());
                let mut request_line = String::new();
                if reader.read_line(&mut request_line).is_err() {
                    return;
                }
                // skip the headers
                let mut line = String::new();
                while reader.read_line(&mut line).unwrap_or(0) > 2 {
                    line.clear();
                }
                let path = request_line.split_whitespace().nth(1).unwrap_or_default();
                let (status, body) = routes
                    .iter()
                    .find(|(route, _, _)| route == path)
                    .map_or((404, &b"Not Found"[..]), |(_, status, body)| {
                        (*status, body.as_slice())
                    });
                let head = format!(
                    "HTTP/1.1 {status} Canned\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
                    body.len()
                );
                let _ = stream.write_all(head.as_bytes());
                let _ = stream.flush();
                thread::sleep(delay);
                let _ = stream.write_all(body);
            });
        }
    });
    format!("http://{addr}")
}

#[cfg(test)]
fn routes_for(path: &str, bodies: [(u16, &[u8]); 3]) -> Vec<(String, u16, Vec<u8>)> {
    let [metadata, console, environment] = bodies;
    [
        (format!("{path}/api/json"), metadata),
        (format!("{path}/consoleText"), console),
        (format!("{path}/injectedEnvVars/api/json"), environment),
    ]
    .into_iter()
    .map(|(route, (status, body))| (route, status, body.to_vec()))
    .collect()
}

#[test]
fn fetch_all_bodies() {
    let console = b"Started by user admin\r\n\x1b[32mok\x1b[0m\n\xff\xfe done\n";
    let base = serve(routes_for(
        "/job/foo/42",
        [(200, b"{}"), (200, console), (200, br#"{"envMap": {}}"#)],
    ));
    let config = ReportConfig::new(&format!("{base}/job/foo/42"));
    let endpoints = BuildEndpoints::new(&config.build);
    let bodies = config.fetch_bodies(&endpoints).unwrap();
    assert_eq!(bodies.metadata, b"{}");
    assert_eq!(bodies.console, console);
    assert_eq!(bodies.environment, br#"{"envMap": {}}"#);
}

#[test]
fn fail_on_error_status() {
    let base = serve(routes_for(
        "/job/foo/42",
        [(200, b"{}"), (500, b"Internal Server Error"), (200, b"{}")],
    ));
    let config = ReportConfig::new(&format!("{base}/job/foo/42"));
    let endpoints = BuildEndpoints::new(&config.build);
    let err = config.fetch_bodies(&endpoints).unwrap_err();
    assert!(format!("{err:#}").contains("could not fetch the console log"));
    assert!(format!("{err:#}").contains("500"));
}

#[test]
fn fail_on_missing_plugin() {
    // without the EnvInject plugin, Jenkins answers with a 404
    let base = serve(routes_for(
        "/job/foo/42",
        [(200, b"{}"), (200, b""), (404, b"Not Found")],
    ));
    let config = ReportConfig::new(&format!("{base}/job/foo/42"));
    let endpoints = BuildEndpoints::new(&config.build);
    let err = config.fetch_bodies(&endpoints).unwrap_err();
    assert!(format!("{err:#}").contains("injected environment variables"));
}

#[test]
fn fail_on_closed_connection() {
    // accept connections, then hang up without answering
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    thread::spawn(move || {
        for stream in listener.incoming() {
            drop(stream);
        }
    });
    let config = ReportConfig::new(&format!("http://{addr}/job/foo/42"));
    let endpoints = BuildEndpoints::new(&config.build);
    let err = config.fetch_bodies(&endpoints).unwrap_err();
    assert!(format!("{err:#}").contains("could not fetch the"));
}

#[test]
fn wait_for_slow_bodies() {
    let delay = std::time::Duration::from_secs(2);
    let routes = routes_for(
        "/job/foo/42",
        [(200, b"{}"), (200, b"Finished: SUCCESS\n"), (200, br#"{"envMap": {}}"#)],
    );
    let base = serve_slowly(routes.clone(), delay);
    let config = ReportConfig::new(&format!("{base}/job/foo/42"));
    let endpoints = BuildEndpoints::new(&config.build);
    let bodies = config.fetch_bodies(&endpoints).unwrap();
    assert_eq!(bodies.console, b"Finished: SUCCESS\n");

    // an explicit timeout still applies to the whole request
    let base = serve_slowly(routes, delay);
    let config = ReportConfig {
        timeout: Some(std::time::Duration::from_millis(500)),
        ..ReportConfig::new(&format!("{base}/job/foo/42"))
    };
    let endpoints = BuildEndpoints::new(&config.build);
    assert!(config.fetch_bodies(&endpoints).is_err());
}
