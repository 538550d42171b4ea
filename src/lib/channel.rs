use std::io;

/// Byte transport to the sensor.
///
/// Implementations must never block in `read` for longer than their own
/// short poll timeout; returning `Ok(0)` means "nothing yet". Once closed,
/// reads and writes fail with [`io::ErrorKind::NotConnected`].
pub trait Channel {
    fn write(&mut self, data: &[u8]) -> io::Result<()>;
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize>;
    fn is_ready(&self) -> bool;
    /// Drops bytes buffered in either direction.
    fn clear(&mut self) -> io::Result<()>;
    fn close(&mut self);
}

impl<C: Channel + ?Sized> Channel for &mut C {
    fn write(&mut self, data: &[u8]) -> io::Result<()> {
        (**self).write(data)
    }

    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        (**self).read(buf)
    }

    fn is_ready(&self) -> bool {
        (**self).is_ready()
    }

    fn clear(&mut self) -> io::Result<()> {
        (**self).clear()
    }

    fn close(&mut self) {
        (**self).close()
    }
}

pub(crate) fn not_connected() -> io::Error {
    io::Error::new(io::ErrorKind::NotConnected, "channel closed")
}
