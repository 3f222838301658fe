//! Trade executors: where accepted buy and sell decisions go.
//!
//! The simulation only needs [`NoopExecutor`]; [`RecordingExecutor`] keeps a
//! trade log for replays, and [`QueuedExecutor`] moves any executor onto its
//! own worker thread behind a bounded FIFO queue.

use std::sync::mpsc::{self, SyncSender};
use std::thread::{self, JoinHandle};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::PriceEvent;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ExecutorError {
    #[error("order rejected: {0}")]
    Rejected(String),
    #[error("executor already closed")]
    Closed,
    #[error("executor worker panicked")]
    WorkerPanicked,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Side {
    Buy,
    Sell,
}

/// One executed order.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TradeEvent {
    pub side: Side,
    pub price: PriceEvent,
    pub volume: f64,
}

pub trait Executor {
    fn buy(&mut self, price: &PriceEvent, volume: f64) -> Result<(), ExecutorError>;
    fn sell(&mut self, price: &PriceEvent, volume: f64) -> Result<(), ExecutorError>;
    /// Flush and release resources. Called once when a chart ends.
    fn close(&mut self) -> Result<(), ExecutorError> {
        Ok(())
    }
}

impl<E: Executor + ?Sized> Executor for Box<E> {
    fn buy(&mut self, price: &PriceEvent, volume: f64) -> Result<(), ExecutorError> {
        (**self).buy(price, volume)
    }

    fn sell(&mut self, price: &PriceEvent, volume: f64) -> Result<(), ExecutorError> {
        (**self).sell(price, volume)
    }

    fn close(&mut self) -> Result<(), ExecutorError> {
        (**self).close()
    }
}

/// Accepts every order and discards it.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopExecutor;

impl Executor for NoopExecutor {
    fn buy(&mut self, _price: &PriceEvent, _volume: f64) -> Result<(), ExecutorError> {
        Ok(())
    }

    fn sell(&mut self, _price: &PriceEvent, _volume: f64) -> Result<(), ExecutorError> {
        Ok(())
    }
}

/// Keeps every order in memory, in execution order.
#[derive(Debug, Clone, Default)]
pub struct RecordingExecutor {
    trades: Vec<TradeEvent>,
    closed: bool,
}

impl RecordingExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn trades(&self) -> &[TradeEvent] {
        &self.trades
    }

    pub fn into_trades(self) -> Vec<TradeEvent> {
        self.trades
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    fn record(&mut self, side: Side, price: &PriceEvent, volume: f64) -> Result<(), ExecutorError> {
        if self.closed {
            return Err(ExecutorError::Closed);
        }
        self.trades.push(TradeEvent {
            side,
            price: *price,
            volume,
        });
        Ok(())
    }
}

impl Executor for RecordingExecutor {
    fn buy(&mut self, price: &PriceEvent, volume: f64) -> Result<(), ExecutorError> {
        self.record(Side::Buy, price, volume)
    }

    fn sell(&mut self, price: &PriceEvent, volume: f64) -> Result<(), ExecutorError> {
        self.record(Side::Sell, price, volume)
    }

    fn close(&mut self) -> Result<(), ExecutorError> {
        self.closed = true;
        Ok(())
    }
}

// ─── Queued executor ─────────────────────────────────────────────────

/// Runs an executor on a dedicated thread fed by a bounded channel.
///
/// Orders are applied in submission order. A full queue blocks the sender.
/// The first error raised by the inner executor stops the worker and is
/// returned by the next submission or by [`Executor::close`].
pub struct QueuedExecutor<E> {
    tx: Option<SyncSender<TradeEvent>>,
    worker: Option<JoinHandle<Result<E, ExecutorError>>>,
    inner: Option<E>,
}

impl<E: Executor + Send + 'static> QueuedExecutor<E> {
    pub fn new(mut inner: E, capacity: usize) -> Self {
        let (tx, rx) = mpsc::sync_channel::<TradeEvent>(capacity);
        let worker = thread::spawn(move || {
            for order in rx {
                match order.side {
                    Side::Buy => inner.buy(&order.price, order.volume)?,
                    Side::Sell => inner.sell(&order.price, order.volume)?,
                }
            }
            inner.close()?;
            Ok(inner)
        });
        Self {
            tx: Some(tx),
            worker: Some(worker),
            inner: None,
        }
    }

    /// The inner executor, once [`Executor::close`] has succeeded.
    pub fn into_inner(mut self) -> Option<E> {
        self.inner.take()
    }

    fn submit(&mut self, order: TradeEvent) -> Result<(), ExecutorError> {
        let tx = self.tx.as_ref().ok_or(ExecutorError::Closed)?;
        if tx.send(order).is_err() {
            // The worker hung up, which only happens after an inner error.
            return Err(self.join().err().unwrap_or(ExecutorError::Closed));
        }
        Ok(())
    }

    fn join(&mut self) -> Result<(), ExecutorError> {
        self.tx = None;
        let Some(worker) = self.worker.take() else {
            return Err(ExecutorError::Closed);
        };
        let inner = worker.join().map_err(|_| ExecutorError::WorkerPanicked)??;
        self.inner = Some(inner);
        Ok(())
    }
}

impl<E: Executor + Send + 'static> Executor for QueuedExecutor<E> {
    fn buy(&mut self, price: &PriceEvent, volume: f64) -> Result<(), ExecutorError> {
        self.submit(TradeEvent {
            side: Side::Buy,
            price: *price,
            volume,
        })
    }

    fn sell(&mut self, price: &PriceEvent, volume: f64) -> Result<(), ExecutorError> {
        self.submit(TradeEvent {
            side: Side::Sell,
            price: *price,
            volume,
        })
    }

    fn close(&mut self) -> Result<(), ExecutorError> {
        self.join()
    }
}

impl<E> Drop for QueuedExecutor<E> {
    fn drop(&mut self) {
        self.tx = None;
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}
