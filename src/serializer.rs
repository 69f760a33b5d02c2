//! Single worker that runs submitted tasks one at a time, in order.
//!
//! Callers never block: [`MutationSerializer::submit`] only queues. Edit
//! actions are bracketed with `begin_edit`/`end_edit` on the presenter, so
//! the front end locks its editing controls for exactly the span of the
//! action and refreshes once afterwards.

use std::panic::{self, AssertUnwindSafe};
use std::sync::mpsc::{self, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use log::{debug, error};
use parking_lot::Mutex;

use crate::error::Result;
use crate::presenter::Presenter;

type Job = Box<dyn FnOnce() + Send + 'static>;

pub struct MutationSerializer {
    sender: Mutex<Option<Sender<Job>>>,
    worker: Mutex<Option<JoinHandle<()>>>,
    presenter: Arc<dyn Presenter>,
}

/// Ends the edit bracket even if the action panics.
struct EditGuard<'a>(&'a dyn Presenter);

impl Drop for EditGuard<'_> {
    fn drop(&mut self) {
        self.0.end_edit();
    }
}

impl MutationSerializer {
    pub fn spawn(presenter: Arc<dyn Presenter>) -> Result<Self> {
        let (sender, receiver) = mpsc::channel::<Job>();
        let worker = thread::Builder::new()
            .name("Card Database Worker".into())
            .spawn(move || {
                for job in receiver {
                    if panic::catch_unwind(AssertUnwindSafe(job)).is_err() {
                        error!("Card database task panicked.");
                    }
                }
                debug!("Card database worker stopped.");
            })?;
        Ok(Self {
            sender: Mutex::new(Some(sender)),
            worker: Mutex::new(Some(worker)),
            presenter,
        })
    }

    /// Queue a task behind everything already submitted.
    pub fn submit<F>(&self, task: F)
    where
        F: FnOnce() + Send + 'static,
    {
        match self.sender.lock().as_ref() {
            Some(sender) => {
                if sender.send(Box::new(task)).is_err() {
                    error!("Card database worker is gone; task dropped.");
                }
            }
            None => error!("Card database worker shut down; task dropped."),
        }
    }

    /// Queue a mutation action, bracketed by `begin_edit`/`end_edit`.
    pub fn submit_edit<F>(&self, action: F)
    where
        F: FnOnce() + Send + 'static,
    {
        let presenter = Arc::clone(&self.presenter);
        self.submit(move || {
            presenter.begin_edit();
            let _guard = EditGuard(presenter.as_ref());
            action();
        });
    }

    /// Block until every task submitted before this call has run.
    pub fn wait_idle(&self) {
        let (done, finished) = mpsc::channel::<()>();
        self.submit(move || {
            let _ = done.send(());
        });
        let _ = finished.recv();
    }

    /// Run what is already queued, then stop the worker.
    pub fn shutdown(&self) {
        self.sender.lock().take();
        if let Some(worker) = self.worker.lock().take() {
            let _ = worker.join();
        }
    }
}

impl Drop for MutationSerializer {
    fn drop(&mut self) {
        self.shutdown();
    }
}
