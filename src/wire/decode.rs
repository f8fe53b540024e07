//! Topic0 dispatch and ABI decoding.

use alloy::primitives::{Log as PrimitiveLog, LogData};
use alloy::sol_types::SolEvent;

use super::frame::RawLog;
use crate::abi::{erc20, fourmeme, pancake_v2};
use crate::types::events::{EventOrigin, SwapEvent};

/// A decoded known-ABI event. Only [`DecodedEvent::Swap`] feeds the filter
/// pipeline directly; the others are informational (direction hints,
/// graduation bookkeeping).
#[derive(Debug, Clone, PartialEq)]
pub enum DecodedEvent {
    /// A swap, either an on-curve Fourmeme trade or a PancakeSwap V2 swap.
    Swap(SwapEvent),
    /// An ERC20 transfer, used to disambiguate token direction when needed.
    Transfer {
        token: alloy::primitives::Address,
        from: alloy::primitives::Address,
        to: alloy::primitives::Address,
        value: alloy::primitives::U256,
    },
    /// A Fourmeme token's bonding curve filled and handed off to a V2 pair.
    Graduated {
        token: alloy::primitives::Address,
        pair: alloy::primitives::Address,
    },
}

/// Decode `raw` into a known event, or `None` if `topics[0]` does not match
/// any ABI this engine understands (the caller drops the frame and
/// increments a counter).
///
/// # Errors
/// Returns `AppError::Decode(_)` when the topic matches a known signature
/// but the data layout doesn't decode against that ABI.
pub fn decode_log(raw: &RawLog) -> crate::error::Result<Option<DecodedEvent>> {
    let Some(topic0) = raw.topics.first() else {
        return Ok(None);
    };

    let log = to_primitive_log(raw)?;

    if topic0.as_slice() == pancake_v2::Swap::SIGNATURE_HASH.as_slice() {
        let decoded = decode_event::<pancake_v2::Swap>(&log)?;
        return Ok(Some(DecodedEvent::Swap(SwapEvent {
            tx_hash: raw.transaction_hash,
            log_index: raw.log_index,
            pair: raw.address,
            token0: alloy::primitives::Address::ZERO,
            token1: alloy::primitives::Address::ZERO,
            amount0_in: decoded.amount0In,
            amount0_out: decoded.amount0Out,
            amount1_in: decoded.amount1In,
            amount1_out: decoded.amount1Out,
            block_number: raw.block_number,
            timestamp: None,
            origin: EventOrigin::External,
        })));
    }

    if topic0.as_slice() == fourmeme::TokenPurchase::SIGNATURE_HASH.as_slice() {
        let decoded = decode_event::<fourmeme::TokenPurchase>(&log)?;
        return Ok(Some(DecodedEvent::Swap(SwapEvent {
            tx_hash: raw.transaction_hash,
            log_index: raw.log_index,
            pair: raw.address,
            token0: decoded.token,
            token1: alloy::primitives::Address::ZERO,
            amount0_in: decoded.bnbIn,
            amount0_out: alloy::primitives::U256::ZERO,
            amount1_in: alloy::primitives::U256::ZERO,
            amount1_out: decoded.tokenOut,
            block_number: raw.block_number,
            timestamp: None,
            origin: EventOrigin::Internal,
        })));
    }

    if topic0.as_slice() == fourmeme::TokenSale::SIGNATURE_HASH.as_slice() {
        let decoded = decode_event::<fourmeme::TokenSale>(&log)?;
        return Ok(Some(DecodedEvent::Swap(SwapEvent {
            tx_hash: raw.transaction_hash,
            log_index: raw.log_index,
            pair: raw.address,
            token0: decoded.token,
            token1: alloy::primitives::Address::ZERO,
            amount0_in: decoded.tokenIn,
            amount0_out: alloy::primitives::U256::ZERO,
            amount1_in: alloy::primitives::U256::ZERO,
            amount1_out: decoded.bnbOut,
            block_number: raw.block_number,
            timestamp: None,
            origin: EventOrigin::Internal,
        })));
    }

    if topic0.as_slice() == fourmeme::TokenGraduated::SIGNATURE_HASH.as_slice() {
        let decoded = decode_event::<fourmeme::TokenGraduated>(&log)?;
        return Ok(Some(DecodedEvent::Graduated {
            token: decoded.token,
            pair: decoded.pair,
        }));
    }

    if topic0.as_slice() == erc20::Transfer::SIGNATURE_HASH.as_slice() {
        let decoded = decode_event::<erc20::Transfer>(&log)?;
        return Ok(Some(DecodedEvent::Transfer {
            token: raw.address,
            from: decoded.from,
            to: decoded.to,
            value: decoded.value,
        }));
    }

    Ok(None)
}

fn to_primitive_log(raw: &RawLog) -> crate::error::Result<PrimitiveLog> {
    let data = LogData::new(raw.topics.clone(), raw.data.clone()).ok_or_else(|| {
        crate::error::AppError::Decode(format!(
            "log at {}:{} has more than 4 topics",
            raw.transaction_hash, raw.log_index
        ))
    })?;
    Ok(PrimitiveLog { address: raw.address, data })
}

fn decode_event<Ev: SolEvent>(log: &PrimitiveLog) -> crate::error::Result<Ev> {
    let decoded = Ev::decode_log(log)
        .map_err(|e| crate::error::AppError::Decode(format!("failed to decode {}: {e}", Ev::SIGNATURE)))?;
    Ok(decoded.data)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use alloy::primitives::{Address, B256, U256};
    use alloy::sol_types::SolEvent;

    use super::*;

    fn raw_log_for<Ev: SolEvent>(topics: Vec<B256>, data: alloy::primitives::Bytes) -> RawLog {
        let _ = Ev::SIGNATURE;
        RawLog {
            address: Address::from([9u8; 20]),
            topics,
            data,
            block_number: 100,
            transaction_hash: B256::from([1u8; 32]),
            log_index: 0,
        }
    }

    #[test]
    fn unknown_topic_returns_none() {
        let raw = RawLog {
            address: Address::ZERO,
            topics: vec![B256::repeat_byte(0xFF)],
            data: alloy::primitives::Bytes::new(),
            block_number: 1,
            transaction_hash: B256::ZERO,
            log_index: 0,
        };
        assert!(decode_log(&raw).unwrap().is_none());
    }

    #[test]
    fn no_topics_returns_none() {
        let raw = RawLog {
            address: Address::ZERO,
            topics: vec![],
            data: alloy::primitives::Bytes::new(),
            block_number: 1,
            transaction_hash: B256::ZERO,
            log_index: 0,
        };
        assert!(decode_log(&raw).unwrap().is_none());
    }

    #[test]
    fn malformed_data_for_known_topic_is_decode_error() {
        let topic0 = pancake_v2::Swap::SIGNATURE_HASH;
        let raw = raw_log_for::<pancake_v2::Swap>(
            vec![topic0, B256::ZERO, B256::ZERO],
            alloy::primitives::Bytes::from(vec![0u8; 4]),
        );
        let result = decode_log(&raw);
        assert!(matches!(result, Err(crate::error::AppError::Decode(_))));
    }

    #[test]
    fn decodes_pancake_swap_into_external_swap_event() {
        let event = pancake_v2::Swap {
            sender: Address::from([1u8; 20]),
            amount0In: U256::from(600u64),
            amount1In: U256::ZERO,
            amount0Out: U256::ZERO,
            amount1Out: U256::from(42u64),
            to: Address::from([2u8; 20]),
        };
        let encoded = event.encode_data();
        let raw = RawLog {
            address: Address::from([9u8; 20]),
            topics: vec![
                pancake_v2::Swap::SIGNATURE_HASH,
                B256::left_padding_from(event.sender.as_slice()),
                B256::left_padding_from(event.to.as_slice()),
            ],
            data: alloy::primitives::Bytes::from(encoded),
            block_number: 100,
            transaction_hash: B256::from([1u8; 32]),
            log_index: 3,
        };
        let decoded = decode_log(&raw).unwrap().expect("recognized topic");
        match decoded {
            DecodedEvent::Swap(swap) => {
                assert_eq!(swap.origin, EventOrigin::External);
                assert_eq!(swap.amount0_in, U256::from(600u64));
                assert_eq!(swap.amount1_out, U256::from(42u64));
                assert_eq!(swap.log_index, 3);
            }
            other => panic!("expected Swap, got {other:?}"),
        }
    }
}
