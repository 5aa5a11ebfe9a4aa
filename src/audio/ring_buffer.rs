use super::constants::FIFO_CAPACITY;

/// Fixed-capacity single-producer/single-consumer queue
///
/// Moves sample blocks from the audio thread to the analyser and FFT frames/render paths
/// between the analysis stages. Both ends never block: a full queue rejects the newest item
/// and an empty queue yields nothing. Items are moved in and out, so pushing a `Copy` payload
/// or an already-built value never allocates.
///
/// Use [`LockFreeRingBuffer::split`] when the two ends live on different threads.
pub struct LockFreeRingBuffer<T> {
    producer: RingProducer<T>,
    consumer: RingConsumer<T>,
}

/// Writing end of a [`LockFreeRingBuffer`]
pub struct RingProducer<T> {
    inner: rtrb::Producer<T>,
}

/// Reading end of a [`LockFreeRingBuffer`]
pub struct RingConsumer<T> {
    inner: rtrb::Consumer<T>,
}

impl<T> LockFreeRingBuffer<T> {
    /// Create a queue holding at most `capacity` pending items
    pub fn new(capacity: usize) -> Self {
        let (producer, consumer) = rtrb::RingBuffer::new(capacity);
        Self {
            producer: RingProducer { inner: producer },
            consumer: RingConsumer { inner: consumer },
        }
    }

    /// Same as [`LockFreeRingBuffer::new`] with the default 30 slots
    pub fn with_default_capacity() -> Self {
        Self::new(FIFO_CAPACITY)
    }

    /// Separate the two ends so they can be handed to different threads
    pub fn split(self) -> (RingProducer<T>, RingConsumer<T>) {
        (self.producer, self.consumer)
    }

    pub fn push(&mut self, item: T) -> bool {
        self.producer.push(item)
    }

    pub fn pop(&mut self) -> Option<T> {
        self.consumer.pop()
    }

    pub fn available_for_read(&self) -> usize {
        self.consumer.available_for_read()
    }

    pub fn capacity(&self) -> usize {
        self.producer.capacity()
    }

    /// Discard everything that is queued
    pub fn clear(&mut self) {
        self.consumer.clear();
    }
}

impl<T> RingProducer<T> {
    /// Queue `item`, returns `false` (dropping the item) when the queue is full
    pub fn push(&mut self, item: T) -> bool {
        self.inner.push(item).is_ok()
    }

    pub fn capacity(&self) -> usize {
        self.inner.buffer().capacity()
    }
}

impl<T> RingConsumer<T> {
    /// Take the oldest queued item, if any
    pub fn pop(&mut self) -> Option<T> {
        self.inner.pop().ok()
    }

    pub fn available_for_read(&self) -> usize {
        self.inner.slots()
    }

    pub fn clear(&mut self) {
        while self.inner.pop().is_ok() {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_then_pop_returns_same_item() {
        let mut fifo = LockFreeRingBuffer::<[f32; 4]>::with_default_capacity();
        let block = [0.25, -0.5, 0.75, 1.0];

        assert!(fifo.push(block));
        assert_eq!(fifo.pop(), Some(block));
        assert_eq!(fifo.pop(), None);
    }

    #[test]
    fn push_past_capacity_fails() {
        let mut fifo = LockFreeRingBuffer::<usize>::with_default_capacity();
        assert_eq!(fifo.capacity(), FIFO_CAPACITY);

        for i in 0..FIFO_CAPACITY {
            assert!(fifo.push(i), "push {i} should succeed");
        }
        assert!(!fifo.push(FIFO_CAPACITY));
        assert_eq!(fifo.available_for_read(), FIFO_CAPACITY);

        // The rejected item never made it in, the oldest one is still first
        assert_eq!(fifo.pop(), Some(0));
        assert!(fifo.push(99));
    }

    #[test]
    fn available_for_read_never_exceeds_capacity() {
        let mut fifo = LockFreeRingBuffer::<u8>::new(4);
        for i in 0..10u8 {
            fifo.push(i);
            assert!(fifo.available_for_read() <= fifo.capacity());
        }
        fifo.clear();
        assert_eq!(fifo.available_for_read(), 0);
    }

    #[test]
    fn split_ends_work_across_threads() {
        let (mut producer, mut consumer) = LockFreeRingBuffer::<u32>::new(8).split();

        let writer = std::thread::spawn(move || {
            let mut sent = 0;
            for i in 0..8 {
                if producer.push(i) {
                    sent += 1;
                }
            }
            sent
        });
        let sent = writer.join().unwrap();

        let mut received = Vec::new();
        while let Some(value) = consumer.pop() {
            received.push(value);
        }
        assert_eq!(sent, 8);
        assert_eq!(received, (0..8).collect::<Vec<_>>());
    }
}
