use crate::error::BoxError;
use crate::resume::Resumable;

/// Adapter giving any [`Iterator`] the [`Resumable`] contract.
///
/// Maintains the produced-value slot the contract requires: the latest
/// yielded value stays readable via [`current`](Resumable::current) until the
/// next resume, and the slot empties once the iterator is exhausted or the
/// producer is disposed.
///
/// # Examples
///
/// ```rust
/// use callweave::resume::{IterProducer, Resumable};
///
/// let mut producer = IterProducer::new(vec![1, 2, 3].into_iter());
/// assert!(producer.resume()?);
/// assert_eq!(producer.current(), Some(&1));
/// # Ok::<(), callweave::BoxError>(())
/// ```
pub struct IterProducer<I: Iterator> {
    iter: I,
    slot: Option<I::Item>,
    disposed: bool,
}

impl<I: Iterator> IterProducer<I> {
    /// Wraps an iterator as a resumable producer
    pub fn new(iter: I) -> Self {
        IterProducer {
            iter,
            slot: None,
            disposed: false,
        }
    }
}

impl<I: Iterator> Resumable for IterProducer<I> {
    type Item = I::Item;

    fn resume(&mut self) -> std::result::Result<bool, BoxError> {
        if self.disposed {
            self.slot = None;
            return Ok(false);
        }
        self.slot = self.iter.next();
        Ok(self.slot.is_some())
    }

    fn current(&self) -> Option<&Self::Item> {
        self.slot.as_ref()
    }

    fn dispose(&mut self) {
        self.disposed = true;
        self.slot = None;
    }
}
