//! A fixed-capacity ring-buffer queue.
//!
//! [`crate::Graph::topological_sort`] seeds this with every source node up
//! front, so a capacity equal to the node count never needs to grow —
//! no reallocation happens during the sort.

pub struct RingQueue<T> {
    buf: Vec<Option<T>>,
    head: usize,
    len: usize,
}

impl<T> RingQueue<T> {
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            buf: (0..capacity).map(|_| None).collect(),
            head: 0,
            len: 0,
        }
    }

    pub fn push_back(&mut self, value: T) {
        if self.len == self.buf.len() {
            // Sources can exceed the initial node count only if the caller
            // mis-sized the queue; grow rather than panic.
            self.grow();
        }
        let idx = (self.head + self.len) % self.buf.len();
        self.buf[idx] = Some(value);
        self.len += 1;
    }

    pub fn pop_front(&mut self) -> Option<T> {
        if self.len == 0 {
            return None;
        }
        let value = self.buf[self.head].take();
        self.head = (self.head + 1) % self.buf.len();
        self.len -= 1;
        value
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    fn grow(&mut self) {
        let mut new_buf: Vec<Option<T>> = (0..self.buf.len() * 2 + 1).map(|_| None).collect();
        for i in 0..self.len {
            new_buf[i] = self.buf[(self.head + i) % self.buf.len()].take();
        }
        self.buf = new_buf;
        self.head = 0;
    }
}
