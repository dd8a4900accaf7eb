//! The persistent child process that actually runs a compiled script. One
//! `worker_process` instance is spawned per pool slot by `worker_pool` and
//! lives across many requests, reading one length-prefixed JSON `Request`
//! per `Calculate`/`Sweep` step from stdin and writing one `Response` to
//! stdout. A zero-length frame on stdin tells it to exit. See `spec.md` §9
//! and `SPEC_FULL.md` §9 "Global worker pool".

use std::io::{self, BufReader, BufWriter};

use worker_process::protocol::{read_frame, write_frame, Request, Response};

fn main() {
    env_logger::init();

    let stdin = io::stdin();
    let stdout = io::stdout();
    let mut reader = BufReader::new(stdin.lock());
    let mut writer = BufWriter::new(stdout.lock());

    loop {
        let frame = match read_frame(&mut reader) {
            Ok(Some(frame)) => frame,
            Ok(None) => {
                log::info!("worker received shutdown sentinel, exiting");
                break;
            }
            Err(e) => {
                log::error!("worker failed to read request frame: {e}");
                break;
            }
        };

        let response = match serde_json::from_slice::<Request>(&frame) {
            Ok(request) => match sandbox_runtime::run_unit(&request.unit, &request.overrides) {
                Ok(outcome) => Response {
                    ok: true,
                    outcome: Some(outcome),
                    error: None,
                },
                Err(e) => Response {
                    ok: false,
                    outcome: None,
                    error: Some(e.to_string()),
                },
            },
            Err(e) => Response {
                ok: false,
                outcome: None,
                error: Some(format!("malformed request: {e}")),
            },
        };

        let body = match serde_json::to_vec(&response) {
            Ok(body) => body,
            Err(e) => {
                log::error!("worker failed to serialize response: {e}");
                break;
            }
        };

        if let Err(e) = write_frame(&mut writer, &body) {
            log::error!("worker failed to write response frame: {e}");
            break;
        }
    }
}
