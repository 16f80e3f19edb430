use std::cell::RefCell;
use std::fmt::Write;
use std::rc::Rc;

/// A `fmt::Write` sink whose clones all append to the same buffer. Hand one
/// clone to a tree as its debug writer and read the trace back from another.
#[derive(Clone, Default)]
pub struct SharedStringWriter(Rc<RefCell<String>>);

impl Write for SharedStringWriter {
    fn write_str(&mut self, s: &str) -> Result<(), std::fmt::Error> {
        self.0.borrow_mut().write_str(s)
    }
}

impl SharedStringWriter {
    pub fn new() -> Self {
        SharedStringWriter(Rc::new(RefCell::new(String::new())))
    }

    pub fn borrow(&self) -> std::cell::Ref<'_, String> {
        self.0.borrow()
    }

    /// Returns everything written so far and empties the buffer.
    pub fn take(&self) -> String {
        std::mem::take(&mut *self.0.borrow_mut())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_share_one_buffer() {
        let reader = SharedStringWriter::new();
        let mut writer = reader.clone();
        writeln!(writer, "rotate {}", 1).unwrap();
        write!(writer, "done").unwrap();
        assert_eq!(reader.borrow().as_str(), "rotate 1\ndone");
        assert_eq!(reader.take(), "rotate 1\ndone");
        assert!(reader.borrow().is_empty());
    }
}
