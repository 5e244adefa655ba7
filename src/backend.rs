use tokio::sync::{mpsc, watch};
use log::{debug, error, info};
use crate::orchestrator::{Orchestrator, RunSnapshot};
use crate::InfuseFoot;

/// Public API for the presentation layer - owns the command loop task
pub struct InfuseBackend
{   hand: crate::InfuseHand
  , orchestrator: Orchestrator
  , _task_handle: tokio::task::JoinHandle<()>
}

impl InfuseBackend
{   /// Create and spawn a new backend around `orchestrator`
    /// Returns immediately - spawns background task
    pub fn new(orchestrator: Orchestrator) -> Self
    {   debug!("Creating InfuseBackend with task ownership");

        let (submit_tx, submit_rx)
          = mpsc::unbounded_channel();
        let (kill_process_tx, kill_process_rx)
          = mpsc::unbounded_channel();

        let hand = crate::InfuseHand
        {   submit_tx
          , kill_process_tx
        };

        let foot = crate::InfuseFoot
        {   submit_rx
          , kill_process_rx
        };

        let loop_orchestrator = orchestrator.clone();
        let _task_handle = tokio::spawn(async move {
          run_backend_loop(foot, loop_orchestrator).await
        });

        InfuseBackend
        {   hand
          , orchestrator
          , _task_handle
        }
    }

    /// Receive every published snapshot of the current run
    pub fn subscribe(&self) -> watch::Receiver<RunSnapshot>
    {   self.orchestrator.subscribe()
    }

    pub fn snapshot(&self) -> RunSnapshot
    {   self.orchestrator.snapshot()
    }

    /// Submit a prompt - returns almost immediately.
    /// The receiver yields the settled snapshot, or the validation error
    /// for a blank prompt.
    pub async fn submit(
      &self
    , prompt: String
    ) -> Result<
        mpsc::UnboundedReceiver<crate::SubmitReply>,
        crate::error::Error
      >
    {   debug!("submit queuing prompt of {} bytes", prompt.len());
        let (reply_tx, reply_rx)
          = mpsc::unbounded_channel();

        let cmd = crate::SubmitArgs
        {   prompt
          , reply: reply_tx
        };

        self.hand.submit_tx
          .send(cmd)
          .map_err(|_| {
            error!("Backend channel closed");
            crate::error::Error::Other(
              "Backend disconnected".to_string()
            )
          })?;

        Ok(reply_rx)
    }

    /// Gracefully shutdown the backend.
    /// Runs already in flight are not cancelled.
    pub async fn shutdown(self)
      -> Result<(), crate::error::Error>
    {   debug!("Shutting down InfuseBackend");
        let (reply_tx, mut reply_rx)
          = mpsc::unbounded_channel();

        let cmd = crate::KillProcessArgs
        {   reply: reply_tx
        };

        self.hand.kill_process_tx
          .send(cmd)
          .map_err(|_| {
            error!("Backend channel already closed");
            crate::error::Error::Other(
              "Backend already shutdown".to_string()
            )
          })?;

        // Wait for shutdown confirmation
        if let Some(result) = reply_rx.recv().await
        {   debug!("Backend shutdown confirmed");
            result
        } else
        {   error!("Backend exited without confirming shutdown");
            Err(crate::error::Error::Other(
              "Backend exited without confirming shutdown".to_string()
            ))
        }
    }
}

/// Main backend event loop
///
/// tokio::select! is ONLY for fast queueing. A submit begins its run
/// synchronously, so runs become current in submission order, then the
/// run executes on its own task.
async fn run_backend_loop(
  foot: crate::InfuseFoot
, orchestrator: Orchestrator
)
{   debug!("Starting InfuseBackend event loop");
    let InfuseFoot
    {   mut submit_rx
      , mut kill_process_rx
    } = foot;

    loop
    { tokio::select!
      { Some(cmd) = submit_rx.recv() => {
          match orchestrator.begin(&cmd.prompt)
          {   Ok(run) => {
                debug!("Received Submit, starting run {}", run.id());
                let orchestrator = orchestrator.clone();
                tokio::spawn(async move {
                  let snapshot = orchestrator.execute(run).await;
                  let _ = cmd.reply.send(Ok(snapshot));
                });
              }
            , Err(e) => {
                debug!("Received Submit with invalid prompt");
                let _ = cmd.reply.send(Err(e));
              }
          }
        }
      , Some(cmd) = kill_process_rx.recv() => {
          debug!("Received KillProcess");
          let _ = cmd.reply.send(Ok(()));
          info!("InfuseBackend shutting down");
          break;
        }
      , else => {
          debug!("All command channels closed");
          break;
        }
      }
    }
}
