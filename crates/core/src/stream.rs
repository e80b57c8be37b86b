//! Streaming of progressive results.

mod repair;

use std::fmt::{self, Debug};
use std::sync::{Arc, Mutex, PoisonError};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::mpsc::{self, UnboundedReceiver};

pub use repair::repair_json;

use crate::model_client::DeltaFn;

/// A piece of progressive output.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "camelCase")]
pub enum StreamChunk<T> {
    /// A human readable progress message.
    Status(String),
    /// A partial or complete result.
    Data(T),
}

/// Delivers chunks to a caller-supplied sink.
///
/// Chunks are delivered synchronously, so the sink observes them in the
/// order they were emitted. Clones share the same sink.
pub struct Emitter<T> {
    sink: Arc<dyn Fn(StreamChunk<T>) + Send + Sync>,
}

impl<T> Clone for Emitter<T> {
    #[inline]
    fn clone(&self) -> Self {
        Self {
            sink: Arc::clone(&self.sink),
        }
    }
}

impl<T> Debug for Emitter<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Emitter").finish_non_exhaustive()
    }
}

impl<T: 'static> Emitter<T> {
    /// Creates an emitter calling `sink` for every chunk.
    #[inline]
    pub fn from_fn(sink: impl Fn(StreamChunk<T>) + Send + Sync + 'static) -> Self {
        Self {
            sink: Arc::new(sink),
        }
    }

    /// Creates an emitter backed by an unbounded channel.
    ///
    /// Chunks emitted after the receiver is dropped are discarded.
    pub fn channel() -> (Self, UnboundedReceiver<StreamChunk<T>>)
    where
        T: Send,
    {
        let (tx, rx) = mpsc::unbounded_channel();
        let emitter = Self::from_fn(move |chunk| {
            if tx.send(chunk).is_err() {
                trace!("stream receiver is gone, dropping chunk");
            }
        });
        (emitter, rx)
    }

    /// Emits a chunk.
    #[inline]
    pub fn emit(&self, chunk: StreamChunk<T>) {
        (self.sink)(chunk);
    }

    /// Emits a status chunk.
    #[inline]
    pub fn status<S: Into<String>>(&self, message: S) {
        self.emit(StreamChunk::Status(message.into()));
    }

    /// Emits a data chunk.
    #[inline]
    pub fn data(&self, value: T) {
        self.emit(StreamChunk::Data(value));
    }

    /// Returns an emitter of text deltas that re-emits the best current
    /// parse of the accumulated JSON text to this emitter.
    ///
    /// Every data chunk received by the returned emitter is appended to a
    /// buffer, which is then repaired with [`repair_json`] and
    /// deserialized into `U`. A value is only re-emitted when it changed.
    /// Increments that can't be parsed yet are swallowed. Status chunks are
    /// passed through.
    pub fn json_deltas<U, F>(&self, convert: F) -> Emitter<String>
    where
        U: DeserializeOwned + 'static,
        F: Fn(U) -> T + Send + Sync + 'static,
    {
        #[derive(Default)]
        struct Partial {
            buffer: String,
            last: Option<Value>,
        }

        let target = self.clone();
        let partial = Mutex::new(Partial::default());
        Emitter::from_fn(move |chunk: StreamChunk<String>| {
            let delta = match chunk {
                StreamChunk::Status(message) => return target.status(message),
                StreamChunk::Data(delta) => delta,
            };

            let mut partial =
                partial.lock().unwrap_or_else(PoisonError::into_inner);
            partial.buffer.push_str(&delta);
            let Some(value) = repair_json(&partial.buffer)
                .and_then(|repaired| serde_json::from_str::<Value>(&repaired).ok())
            else {
                return;
            };
            if partial.last.as_ref() == Some(&value) {
                return;
            }
            match serde_json::from_value::<U>(value.clone()) {
                Ok(parsed) => {
                    partial.last = Some(value);
                    target.data(convert(parsed));
                }
                Err(err) => trace!("partial output is not usable yet: {err}"),
            }
        })
    }
}

impl Emitter<String> {
    pub(crate) fn delta_fn(&self) -> DeltaFn {
        let emitter = self.clone();
        Arc::new(move |delta| emitter.data(delta))
    }
}
