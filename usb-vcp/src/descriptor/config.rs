use super::{ConfigurationAttributes, ConfigurationDescriptor};

/// Size of the buffer holding the whole configuration descriptor.
pub const CONFIG_DESCRIPTOR_CAPACITY: usize = 256;

/// Hands out space in the active configuration descriptor to interface
/// functions.
pub trait DescriptorAllocator {
    /// Reserves `len` bytes right after the descriptors committed so far.
    ///
    /// Returns `None` if the configuration descriptor has no room left. The
    /// reservation only becomes part of the configuration once
    /// [`add_iface`](DescriptorAllocator::add_iface) is called.
    fn alloc_iface(&mut self, len: usize) -> Option<&mut [u8]>;

    /// Commits the last reservation of `len` bytes, which declares
    /// `num_interfaces` interfaces, and returns its offset in the
    /// configuration descriptor.
    fn add_iface(&mut self, len: usize, num_interfaces: u8) -> usize;
}

/// Configuration descriptor storage: the 9-byte configuration header followed
/// by the descriptor blocks of every bound interface.
#[derive(Debug)]
pub struct ConfigDescriptorBuffer {
    header: ConfigurationDescriptor,
    data: [u8; CONFIG_DESCRIPTOR_CAPACITY],
    len: usize,
}

impl ConfigDescriptorBuffer {
    pub fn new(configuration_value: u8, attributes: ConfigurationAttributes, max_power: u8) -> Self {
        let mut buffer = ConfigDescriptorBuffer {
            header: ConfigurationDescriptor {
                total_length: ConfigurationDescriptor::LEN as u16,
                num_interfaces: 0,
                configuration_value,
                configuration_name_idx: 0,
                attributes,
                max_power,
            },
            data: [0; CONFIG_DESCRIPTOR_CAPACITY],
            len: ConfigurationDescriptor::LEN,
        };
        buffer.sync_header();
        buffer
    }

    fn sync_header(&mut self) {
        self.data[..ConfigurationDescriptor::LEN].copy_from_slice(&self.header.to_arr());
    }

    pub fn header(&self) -> &ConfigurationDescriptor {
        &self.header
    }

    pub fn total_length(&self) -> u16 {
        self.header.total_length
    }

    pub fn num_interfaces(&self) -> u8 {
        self.header.num_interfaces
    }

    /// The configuration descriptor as sent to the host.
    pub fn as_bytes(&self) -> &[u8] {
        &self.data[..self.len]
    }
}

impl DescriptorAllocator for ConfigDescriptorBuffer {
    fn alloc_iface(&mut self, len: usize) -> Option<&mut [u8]> {
        let end = self.len.checked_add(len)?;
        self.data.get_mut(self.len..end)
    }

    fn add_iface(&mut self, len: usize, num_interfaces: u8) -> usize {
        let offset = self.len;
        self.len = offset.saturating_add(len).min(CONFIG_DESCRIPTOR_CAPACITY);

        self.header.total_length = self.len as u16;
        self.header.num_interfaces = self.header.num_interfaces.wrapping_add(num_interfaces);
        self.sync_header();

        offset
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::validate_configuration;

    fn buffer() -> ConfigDescriptorBuffer {
        ConfigDescriptorBuffer::new(1, ConfigurationAttributes::BUS_POWERED, 50)
    }

    #[test]
    fn empty_configuration() {
        let config = buffer();

        assert_eq!(config.as_bytes(), &[9, 0x02, 9, 0, 0, 1, 0, 0x80, 50]);
        assert_eq!(validate_configuration(config.as_bytes()), Ok(()));
    }

    #[test]
    fn reservation_is_not_committed() {
        let mut config = buffer();

        let block = config.alloc_iface(16).expect("room for 16 bytes");
        assert_eq!(block.len(), 16);

        assert_eq!(config.total_length(), 9);
        assert_eq!(config.as_bytes().len(), 9);
    }

    #[test]
    fn commit_updates_header() {
        let mut config = buffer();

        config.alloc_iface(66).expect("room for a block")[0] = 66;
        let offset = config.add_iface(66, 2);

        assert_eq!(offset, 9);
        assert_eq!(config.total_length(), 75);
        assert_eq!(config.num_interfaces(), 2);
        assert_eq!(&config.as_bytes()[2..5], &[75, 0, 2]);
        assert_eq!(config.as_bytes()[9], 66);
    }

    #[test]
    fn exhausted() {
        let mut config = buffer();

        assert!(config.alloc_iface(CONFIG_DESCRIPTOR_CAPACITY - 9).is_some());
        assert!(config.alloc_iface(CONFIG_DESCRIPTOR_CAPACITY - 8).is_none());
        assert!(config.alloc_iface(usize::MAX).is_none());
    }
}
