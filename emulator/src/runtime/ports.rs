use std::collections::VecDeque;

use crate::constants::Word;

/// The input and output ports of the machine
///
/// Values on the input port are arbitrary integers, reduced to the register
/// width when `READ` consumes them. The output port receives the raw content
/// of register A.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Ports {
    input: VecDeque<i128>,
    output: VecDeque<Word>,
}

impl Ports {
    pub fn push_input(&mut self, value: i128) {
        self.input.push_back(value);
    }

    pub fn extend_input<I: IntoIterator<Item = i128>>(&mut self, values: I) {
        self.input.extend(values);
    }

    /// Number of values waiting on the input port
    #[must_use]
    pub fn pending_input(&self) -> usize {
        self.input.len()
    }

    pub(crate) fn read(&mut self) -> Option<i128> {
        self.input.pop_front()
    }

    pub(crate) fn write(&mut self, value: Word) {
        self.output.push_back(value);
    }

    pub fn pop_output(&mut self) -> Option<Word> {
        self.output.pop_front()
    }

    pub fn drain_output(&mut self) -> impl Iterator<Item = Word> + '_ {
        self.output.drain(..)
    }

    pub(crate) fn clear(&mut self) {
        self.input.clear();
        self.output.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fifo_test() {
        let mut ports = Ports::default();
        ports.extend_input([1, -2]);
        ports.push_input(3);
        assert_eq!(ports.pending_input(), 3);
        assert_eq!(ports.read(), Some(1));
        assert_eq!(ports.read(), Some(-2));
        assert_eq!(ports.read(), Some(3));
        assert_eq!(ports.read(), None);

        ports.write(7);
        ports.write(8);
        assert_eq!(ports.pop_output(), Some(7));
        ports.write(9);
        assert_eq!(ports.drain_output().collect::<Vec<_>>(), vec![8, 9]);
        assert_eq!(ports.pop_output(), None);
    }

    #[test]
    fn clear_test() {
        let mut ports = Ports::default();
        ports.push_input(1);
        ports.write(2);
        ports.clear();
        assert_eq!(ports, Ports::default());
    }
}
