//! Ping-pong device buffers.
//!
//! Two equally sized device buffers alternate between the input and output
//! roles. After each dispatch the roles swap, so the next filter reads what
//! the previous one wrote without a host round trip.

use crate::ComputeResult;
use crate::backend::{BufferAccess, ComputeDevice, DeviceBuffer, check_transfer_len};

/// A pair of device buffers with alternating roles.
pub struct PingPong<B> {
    slots: [B; 2],
    input: usize,
    capacity: usize,
}

impl<B: DeviceBuffer> PingPong<B> {
    /// Allocates both slots with room for `capacity` bytes each.
    pub fn allocate<D>(device: &D, capacity: usize) -> ComputeResult<Self>
    where
        D: ComputeDevice<Buffer = B>,
    {
        let a = device.create_buffer(capacity as u64, BufferAccess::ReadWrite)?;
        let b = device.create_buffer(capacity as u64, BufferAccess::ReadWrite)?;
        tracing::debug!(capacity, "ping-pong buffers allocated");
        Ok(Self {
            slots: [a, b],
            input: 0,
            capacity,
        })
    }

    /// Copies host bytes into the current input buffer.
    pub fn upload<D>(&self, device: &D, data: &[u8]) -> ComputeResult<()>
    where
        D: ComputeDevice<Buffer = B>,
    {
        check_transfer_len(self.capacity as u64, data.len())?;
        device.write_buffer(self.input(), data)
    }

    /// Copies the current output buffer into host memory.
    pub fn download<D>(&self, device: &D, out: &mut [u8]) -> ComputeResult<()>
    where
        D: ComputeDevice<Buffer = B>,
    {
        check_transfer_len(self.capacity as u64, out.len())?;
        device.read_buffer(self.output(), out)
    }

    /// Exchanges the input and output roles.
    pub fn swap_roles(&mut self) {
        self.input ^= 1;
    }

    pub fn input(&self) -> &B {
        &self.slots[self.input]
    }

    pub fn output(&self) -> &B {
        &self.slots[self.input ^ 1]
    }

    /// Slot index currently holding the input role (0 or 1).
    pub fn input_slot(&self) -> usize {
        self.input
    }

    /// Device-reported size of each slot.
    pub fn size_bytes(&self) -> u64 {
        self.slots[0].size_bytes()
    }

    /// Releases both slots, input first.
    pub fn release(self) {
        let [a, b] = self.slots;
        if self.input == 0 {
            drop(a);
            drop(b);
        } else {
            drop(b);
            drop(a);
        }
        tracing::debug!("ping-pong buffers released");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ComputeError, CpuDevice};

    #[test]
    fn roles_alternate() {
        let dev = CpuDevice::new();
        let mut pp = PingPong::allocate(&dev, 16).unwrap();
        assert_eq!(pp.input_slot(), 0);
        pp.swap_roles();
        assert_eq!(pp.input_slot(), 1);
        pp.swap_roles();
        assert_eq!(pp.input_slot(), 0);
        assert_eq!(pp.size_bytes(), 16);
    }

    #[test]
    fn upload_targets_input_download_reads_output() {
        let dev = CpuDevice::new();
        let mut pp = PingPong::allocate(&dev, 8).unwrap();
        pp.upload(&dev, &[1, 2, 3, 4, 5, 6, 7, 8]).unwrap();

        let mut out = [0u8; 8];
        pp.download(&dev, &mut out).unwrap();
        assert_eq!(out, [0; 8]);

        pp.swap_roles();
        pp.download(&dev, &mut out).unwrap();
        assert_eq!(out, [1, 2, 3, 4, 5, 6, 7, 8]);
    }

    #[test]
    fn host_length_must_match() {
        let dev = CpuDevice::new();
        let pp = PingPong::allocate(&dev, 8).unwrap();
        let err = pp.upload(&dev, &[0; 12]).unwrap_err();
        assert!(matches!(err, ComputeError::BufferSizeMismatch { expected: 8, actual: 12 }));
        let mut small = [0u8; 4];
        assert!(pp.download(&dev, &mut small).is_err());
    }
}
