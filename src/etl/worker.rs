// Background processing: one thread, one request in flight at a time.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;
use std::thread;

use serde::{Deserialize, Serialize};
use snafu::prelude::*;

use crate::etl::*;

#[derive(PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct ProcessPayload {
    pub files: Vec<InputFile>,
    #[serde(rename = "sourceType")]
    pub source_type: String,
}

/// `{"type": "process", "payload": {"files": [...], "sourceType": "..."}}`
#[derive(PartialEq, Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Request {
    Process { payload: ProcessPayload },
}

/// Exactly one response is sent for every request.
#[derive(PartialEq, Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Response {
    Success {
        payload: Vec<OutputRecord>,
        /// The files that were skipped, and why.
        #[serde(default)]
        warnings: Vec<String>,
    },
    Error {
        error: String,
    },
}

impl Response {
    pub fn from_outcome(outcome: &EtlResult<ProcessOutcome>) -> Response {
        match outcome {
            Ok(o) => Response::Success {
                payload: o.records.clone(),
                warnings: o.warnings.clone(),
            },
            Err(e) => Response::Error {
                error: e.to_string(),
            },
        }
    }
}

pub fn handle_request(request: Request) -> Response {
    match request {
        Request::Process { payload } => {
            Response::from_outcome(&process_batch(&payload.files, &payload.source_type))
        }
    }
}

struct Job {
    request: Request,
    reply: Sender<Response>,
}

/// The answer to a submitted request, to be collected once.
pub struct PendingResponse {
    reply: Receiver<Response>,
}

impl PendingResponse {
    /// Blocks until the worker answers.
    pub fn wait(self) -> EtlResult<Response> {
        self.reply.recv().ok().context(WorkerGoneSnafu {})
    }
}

/// A background thread that processes one request at a time.
///
/// A new request is refused while the previous one has not been answered.
pub struct Worker {
    jobs: Option<Sender<Job>>,
    in_flight: Arc<AtomicBool>,
    handle: Option<thread::JoinHandle<()>>,
}

impl Worker {
    pub fn spawn() -> EtlResult<Worker> {
        let (jobs, queue) = mpsc::channel::<Job>();
        let in_flight = Arc::new(AtomicBool::new(false));
        let flag = in_flight.clone();
        let handle = thread::Builder::new()
            .name("etl-worker".to_string())
            .spawn(move || worker_loop(queue, flag))
            .context(SpawnWorkerSnafu {})?;
        Ok(Worker {
            jobs: Some(jobs),
            in_flight,
            handle: Some(handle),
        })
    }

    pub fn submit(&self, request: Request) -> EtlResult<PendingResponse> {
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return WorkerBusySnafu {}.fail();
        }
        let (reply, pending) = mpsc::channel::<Response>();
        let sent = match self.jobs.as_ref() {
            Some(jobs) => jobs.send(Job { request, reply }).is_ok(),
            None => false,
        };
        if !sent {
            self.in_flight.store(false, Ordering::SeqCst);
            return WorkerGoneSnafu {}.fail();
        }
        Ok(PendingResponse { reply: pending })
    }

    /// Submits a request and waits for its response.
    pub fn process(&self, request: Request) -> EtlResult<Response> {
        self.submit(request)?.wait()
    }
}

impl Drop for Worker {
    fn drop(&mut self) {
        // Closing the queue ends the loop once the current job is done.
        self.jobs.take();
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                warn!("Worker: the worker thread panicked");
            }
        }
    }
}

fn worker_loop(queue: Receiver<Job>, in_flight: Arc<AtomicBool>) {
    info!("worker_loop: started");
    for job in queue.iter() {
        let response = handle_request(job.request);
        match &response {
            Response::Success { payload, warnings } => info!(
                "worker_loop: success, {} records, {} warnings",
                payload.len(),
                warnings.len()
            ),
            Response::Error { error } => warn!("worker_loop: error: {}", error),
        }
        in_flight.store(false, Ordering::SeqCst);
        if job.reply.send(response).is_err() {
            debug!("worker_loop: the requester is gone, dropping the response");
        }
    }
    info!("worker_loop: stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const SNIS_CSV: &str = "Código do Município;Município;Ano de Referência;IN055;IN015\n\
        355030;São Paulo;2021;99,3;10\n\
        330455;Rio de Janeiro;2021;95,0;x\n";

    fn snis_request() -> Request {
        Request::Process {
            payload: ProcessPayload {
                files: vec![InputFile::new("snis_2021.csv", SNIS_CSV.as_bytes())],
                source_type: "SNIS".to_string(),
            },
        }
    }

    #[test]
    fn process_on_the_worker() {
        let _ = env_logger::builder().is_test(true).try_init();
        let worker = Worker::spawn().unwrap();
        let response = worker.process(snis_request()).unwrap();
        match response {
            Response::Success { payload, warnings } => {
                assert!(warnings.is_empty());
                assert_eq!(payload.len(), 3);
                assert_eq!(payload[0].municipality_code, "355030");
                assert_eq!(payload[0].indicator_name, "IN055");
                assert_eq!(payload[0].position, 1);
                assert_eq!(payload[1].municipality_code, "330455");
                assert_eq!(payload[1].positional_index, 0.0);
                assert_eq!(payload[2].indicator_name, "IN015");
                assert_eq!(payload[2].positional_index, 1.0);
            }
            x => panic!("unexpected response {:?}", x),
        }
        // The worker accepts a new request once the previous one is answered.
        assert!(worker.process(snis_request()).is_ok());
    }

    #[test]
    fn errors_are_answered() {
        let worker = Worker::spawn().unwrap();
        let request = Request::Process {
            payload: ProcessPayload {
                files: vec![InputFile::new("a.csv", b"x;y\n1;2\n")],
                source_type: "CENSO".to_string(),
            },
        };
        match worker.process(request).unwrap() {
            Response::Error { error } => assert!(error.contains("CENSO")),
            x => panic!("unexpected response {:?}", x),
        }
    }

    #[test]
    fn one_request_in_flight() {
        // A worker whose queue is only drained once the test says so.
        let (jobs, queue) = mpsc::channel::<Job>();
        let in_flight = Arc::new(AtomicBool::new(false));
        let worker = Worker {
            jobs: Some(jobs),
            in_flight: in_flight.clone(),
            handle: None,
        };

        let first = worker.submit(snis_request()).unwrap();
        assert!(matches!(
            worker.submit(snis_request()),
            Err(EtlError::WorkerBusy {})
        ));

        let consumer = thread::spawn(move || worker_loop(queue, in_flight));
        assert!(matches!(first.wait(), Ok(Response::Success { .. })));
        // Answered: the next request goes through.
        let second = worker.submit(snis_request()).unwrap();
        assert!(matches!(second.wait(), Ok(Response::Success { .. })));

        drop(worker);
        consumer.join().unwrap();
    }

    #[test]
    fn message_format() {
        let js = json!({
            "type": "process",
            "payload": {
                "files": [{"name": "a.csv", "content": [65, 59, 66]}],
                "sourceType": "IPEADATA"
            }
        });
        let request: Request = serde_json::from_value(js).unwrap();
        let Request::Process { payload } = request;
        assert_eq!(payload.source_type, "IPEADATA");
        assert_eq!(payload.files[0].content, b"A;B".to_vec());
        assert_eq!(payload.files[0].first_row_index, None);

        let response = Response::Success {
            payload: vec![OutputRecord {
                municipality_code: "3550308".to_string(),
                indicator_name: "PIB".to_string(),
                year: "2019".to_string(),
                value: 2.5,
                positional_index: 1.0,
                position: 1,
            }],
            warnings: vec![],
        };
        assert_eq!(
            serde_json::to_value(&response).unwrap(),
            json!({
                "type": "success",
                "payload": [{
                    "Codigo_Municipio": "3550308",
                    "Nome_Indicador": "PIB",
                    "Ano_Observacao": "2019",
                    "Valor": 2.5,
                    "Indice_Posicional": 1.0,
                    "Posicao": 1
                }],
                "warnings": []
            })
        );
        let error = Response::Error {
            error: "boom".to_string(),
        };
        assert_eq!(
            serde_json::to_value(&error).unwrap(),
            json!({"type": "error", "error": "boom"})
        );
    }
}
