//! Proptest generators for property-based testing.

use proptest::prelude::*;

use gensync_core::{
    CommunicationMode, Configuration, ConfigurationBuilder, CoreError, DataObject, ElementSet,
    ProtocolIdentity,
};

/// Generate a protocol identity from the catalog.
pub fn protocol_identity() -> impl Strategy<Value = ProtocolIdentity> {
    prop::sample::select(ProtocolIdentity::ALL.to_vec())
}

/// Generate a catalog name.
pub fn protocol_name() -> impl Strategy<Value = &'static str> {
    protocol_identity().prop_map(ProtocolIdentity::name)
}

/// Generate a data object of up to `max_len` bytes.
pub fn data_object(max_len: usize) -> impl Strategy<Value = DataObject> {
    prop::collection::vec(any::<u8>(), 0..=max_len).prop_map(DataObject::from)
}

/// Generate an element set of up to `max_size` small elements.
pub fn element_set(max_size: usize) -> impl Strategy<Value = ElementSet> {
    prop::collection::vec(data_object(16), 0..=max_size)
        .prop_map(|items| items.into_iter().collect())
}

/// Parameters for building a configuration. Zero values are allowed so
/// validation paths get exercised.
#[derive(Debug, Clone)]
pub struct ConfigParams {
    pub protocol: ProtocolIdentity,
    pub port: u16,
    pub err: u32,
    pub mbar: u32,
    pub bits: u32,
    pub partitions: u32,
    pub expected_elements: u32,
}

impl Arbitrary for ConfigParams {
    type Parameters = ();
    type Strategy = BoxedStrategy<Self>;

    fn arbitrary_with(_: Self::Parameters) -> Self::Strategy {
        (
            protocol_identity(),
            any::<u16>(),
            0u32..=64,        // err
            0u32..=100_000,   // mbar
            0u32..=4096,      // bits
            0u32..=16,        // partitions
            0u32..=1_000_000, // expected elements
        )
            .prop_map(
                |(protocol, port, err, mbar, bits, partitions, expected_elements)| ConfigParams {
                    protocol,
                    port,
                    err,
                    mbar,
                    bits,
                    partitions,
                    expected_elements,
                },
            )
            .boxed()
    }
}

/// Build a configuration from parameters.
pub fn config_from_params(params: &ConfigParams) -> Result<Configuration, CoreError> {
    ConfigurationBuilder::new()
        .protocol(params.protocol)
        .comm(CommunicationMode::Socket)
        .port(params.port)
        .err(params.err)
        .mbar(params.mbar)
        .bits(params.bits)
        .partitions(params.partitions)
        .expected_elements(params.expected_elements)
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use gensync_core::{resolve, BITS_PER_UNIT};

    proptest! {
        #[test]
        fn test_build_is_deterministic(params: ConfigParams) {
            prop_assert_eq!(config_from_params(&params), config_from_params(&params));
        }

        #[test]
        fn test_build_rejects_iff_some_field_zero(params: ConfigParams) {
            let any_zero = params.port == 0
                || params.err == 0
                || params.mbar == 0
                || params.bits == 0
                || params.partitions == 0
                || params.expected_elements == 0;
            match config_from_params(&params) {
                Ok(config) => {
                    prop_assert!(!any_zero);
                    let expected_bits = if params.protocol.is_table_based() {
                        params.bits
                    } else {
                        params.bits * BITS_PER_UNIT
                    };
                    prop_assert_eq!(config.bits(), expected_bits);
                }
                Err(e) => {
                    prop_assert!(any_zero);
                    let is_invalid_parameter = matches!(e, CoreError::InvalidParameter { .. });
                    prop_assert!(is_invalid_parameter);
                }
            }
        }

        #[test]
        fn test_catalog_names_resolve(name in protocol_name()) {
            prop_assert_eq!(resolve(name).unwrap().name(), name);
        }

        #[test]
        fn test_element_set_len_matches_distinct(set in element_set(32)) {
            prop_assert_eq!(set.contents().count(), set.len());
        }
    }
}
