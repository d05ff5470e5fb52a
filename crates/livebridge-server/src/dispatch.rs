//! The protocol dispatcher: verb routing and outgoing delivery.
//!
//! One [`Dispatcher`] lives on a single task for the lifetime of the
//! process and consumes [`Envelope`]s strictly in arrival order, so no
//! two evaluations ever interleave. Each matched verb produces a
//! response that is **broadcast to every connected peer**; a request
//! with no recognized verb is answered **directly** to the requester
//! only. The asymmetry is deliberate: peers share one session and see
//! each other's results, while a malformed request concerns nobody but
//! its sender.

use livebridge_context::{ChangeDetector, ContextSlot, dynamic_to_json, json_to_dynamic};
use livebridge_protocol::{Request, Response, Verb};
use serde_json::Value;
use tokio::sync::{broadcast, mpsc, oneshot};
use tracing::{debug, error, warn};
use uuid::Uuid;

use crate::error::DispatchError;
use crate::logfmt::{short_session, trim_payload};

/// One inbound request together with its reply slot.
///
/// The reply slot is used only for direct (non-broadcast) responses;
/// on the broadcast path it is simply dropped and the requester picks
/// the response up from its broadcast subscription like everyone else.
#[derive(Debug)]
pub struct Envelope {
    /// The peer that issued the request.
    pub session: Uuid,
    /// The parsed request.
    pub request: Request,
    /// Slot for a direct reply to the requester only.
    pub reply: oneshot::Sender<Response>,
}

/// How a dispatched response must be delivered.
#[derive(Debug, PartialEq)]
pub enum DispatchOutcome {
    /// Send to every connected peer.
    Broadcast(Response),
    /// Send only to the requester.
    Direct(Response),
}

/// Routes requests by verb to the current execution context.
#[derive(Debug)]
pub struct Dispatcher {
    slot: ContextSlot,
    detector: ChangeDetector,
}

impl Dispatcher {
    /// Create a dispatcher over the shared context slot.
    pub const fn new(slot: ContextSlot) -> Self {
        Self {
            slot,
            detector: ChangeDetector::new(),
        }
    }

    /// Execute the matching verb handler exactly once and decide the
    /// delivery of the result.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError`] only for invocation faults on the
    /// `call` path; every other failure is recovered into an error
    /// response.
    pub async fn dispatch(&mut self, request: &Request) -> Result<DispatchOutcome, DispatchError> {
        match request.verb() {
            Some(Verb::Call) => {
                let routine = request.call.as_deref().unwrap_or_default();
                self.handle_call(routine, request.args.as_ref())
                    .await
                    .map(DispatchOutcome::Broadcast)
            }
            Some(Verb::Eval) => {
                let fragment = request.eval.as_deref().unwrap_or_default();
                Ok(DispatchOutcome::Broadcast(self.handle_eval(fragment).await))
            }
            Some(Verb::Get) => {
                let name = request.get.as_deref().unwrap_or_default();
                Ok(DispatchOutcome::Broadcast(self.handle_get(name).await))
            }
            Some(Verb::Set) => {
                let name = request.set.as_deref().unwrap_or_default();
                Ok(DispatchOutcome::Broadcast(
                    self.handle_set(name, request.value.as_ref()).await,
                ))
            }
            None => Ok(DispatchOutcome::Direct(Response::invalid_request())),
        }
    }

    /// `call`: invoke a named routine. Faults are not recovered.
    async fn handle_call(
        &mut self,
        routine: &str,
        args: Option<&serde_json::Map<String, Value>>,
    ) -> Result<Response, DispatchError> {
        let empty = serde_json::Map::new();
        let kwargs = args.unwrap_or(&empty);

        let mut ctx = self.slot.write().await;
        let value = ctx.invoke(routine, kwargs)?;
        Ok(Response::success(dynamic_to_json(&value)))
    }

    /// `eval`: evaluate a fragment, then run change detection.
    ///
    /// Evaluation faults are captured as an exception response, never
    /// thrown. Detection runs after every non-faulting evaluation
    /// (including a buffered incomplete fragment) and attaches a state
    /// snapshot when the model must be re-published.
    async fn handle_eval(&mut self, fragment: &str) -> Response {
        let mut ctx = self.slot.write().await;
        let report = ctx.evaluate(fragment);

        if report.faulted {
            return Response::exception(report.output);
        }

        let response = Response::success(Value::String(report.output));
        match self.detector.inspect(&ctx) {
            Some(snapshot) => response.with_state(snapshot),
            None => response,
        }
    }

    /// `get`: read a variable; an unbound name is recovered locally.
    async fn handle_get(&self, name: &str) -> Response {
        let ctx = self.slot.read().await;
        match ctx.read(name) {
            Ok(value) => Response::success(dynamic_to_json(&value)),
            Err(_) => Response::error("no such variable"),
        }
    }

    /// `set`: bind a variable; a missing or inconvertible value is
    /// recovered locally.
    async fn handle_set(&self, name: &str, value: Option<&Value>) -> Response {
        let Some(value) = value else {
            return Response::error("could not set variable");
        };
        let Ok(dynamic) = json_to_dynamic(value) else {
            return Response::error("could not set variable");
        };

        let mut ctx = self.slot.write().await;
        ctx.write(name, dynamic);
        Response::ok()
    }
}

/// Run the dispatch loop until the inbound channel closes.
///
/// Consumes envelopes in arrival order, broadcasts matched-verb
/// responses through `tx`, answers invalid requests through the
/// envelope's reply slot, and treats invocation faults as a crash
/// boundary: the fault is logged and the loop keeps serving.
pub async fn run_dispatch(
    mut rx: mpsc::Receiver<Envelope>,
    mut dispatcher: Dispatcher,
    tx: broadcast::Sender<Response>,
    debug_log: bool,
) {
    while let Some(envelope) = rx.recv().await {
        let Envelope {
            session,
            request,
            reply,
        } = envelope;

        if debug_log {
            let payload = serde_json::to_string(&request).unwrap_or_default();
            debug!(
                session = %short_session(session),
                request = %trim_payload(&payload),
                "request received"
            );
        }

        match dispatcher.dispatch(&request).await {
            Ok(DispatchOutcome::Broadcast(response)) => {
                if debug_log {
                    let payload = serde_json::to_string(&response).unwrap_or_default();
                    debug!(
                        session = %short_session(session),
                        response = %trim_payload(&payload),
                        "response broadcast"
                    );
                }
                // send fails only when no client is subscribed, which
                // is normal when the last peer just disconnected.
                if tx.send(response).is_err() {
                    debug!("no connected peers for broadcast");
                }
            }
            Ok(DispatchOutcome::Direct(response)) => {
                warn!(session = %short_session(session), "invalid request");
                if reply.send(response).is_err() {
                    debug!("requester went away before direct reply");
                }
            }
            Err(fault) => {
                // Crash boundary: the request dies here, the loop does not.
                error!(session = %short_session(session), error = %fault, "unrecovered invocation fault");
            }
        }
    }
    debug!("inbound channel closed, dispatch loop exiting");
}
