//! Legacy signature-hash construction (pre-SegWit), per spec.md §4.4.

use thiserror::Error;

use crate::amount::{Amount, NegativeAllowed};
use crate::hash::Hash256;
use crate::serialization::{sha256d, BitcoinSerialize};
use crate::transparent::{OutPoint, Script, TransactionOutput};

use super::Transaction;

pub const SIGHASH_ALL: u8 = 0x01;
pub const SIGHASH_NONE: u8 = 0x02;
pub const SIGHASH_SINGLE: u8 = 0x03;
pub const SIGHASH_ANYONECANPAY: u8 = 0x80;

/// The base signing mode, independent of the `ANYONE_CAN_PAY` modifier.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum SighashBase {
    All,
    None,
    Single,
}

/// A full signature-hash type byte: a base mode plus whether
/// `ANYONE_CAN_PAY` is set.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct SighashType {
    pub base: SighashBase,
    pub anyone_can_pay: bool,
}

impl SighashType {
    pub fn from_byte(byte: u8) -> Result<Self, SighashError> {
        let base = match byte & !SIGHASH_ANYONECANPAY {
            SIGHASH_ALL => SighashBase::All,
            SIGHASH_NONE => SighashBase::None,
            SIGHASH_SINGLE => SighashBase::Single,
            _ => return Err(SighashError::UnknownType(byte)),
        };
        Ok(SighashType {
            base,
            anyone_can_pay: byte & SIGHASH_ANYONECANPAY != 0,
        })
    }

    pub fn to_byte(self) -> u8 {
        let base = match self.base {
            SighashBase::All => SIGHASH_ALL,
            SighashBase::None => SIGHASH_NONE,
            SighashBase::Single => SIGHASH_SINGLE,
        };
        if self.anyone_can_pay {
            base | SIGHASH_ANYONECANPAY
        } else {
            base
        }
    }

    /// The full 32-bit signature-hash-type appended to the hashed preimage:
    /// the type byte zero-extended to four bytes, little-endian.
    fn as_u32(self) -> u32 {
        self.to_byte() as u32
    }
}

#[derive(Error, Debug, Clone, Eq, PartialEq)]
pub enum SighashError {
    #[error("unrecognized sighash type byte 0x{0:02x}")]
    UnknownType(u8),
    #[error("input index {index} is out of range for {input_count} inputs")]
    InputIndexOutOfRange { index: usize, input_count: usize },
    #[error("SIGHASH_SINGLE input index {index} has no corresponding output ({output_count} outputs)")]
    SingleWithoutMatchingOutput { index: usize, output_count: usize },
}

/// One spent outpoint's connected output, as seen by the signer: the
/// scriptPubKey it locked the coins with, for substitution into input `i`.
pub struct ConnectedOutput<'a> {
    pub outpoint: OutPoint,
    pub script: &'a Script,
}

/// Computes the digest that gets signed for input `index`.
///
/// `inputs` is this transaction's own input list paired with the output
/// each one spends (by position); `index` identifies which input is being
/// signed. Returns the 32-byte double-SHA-256 digest.
pub fn signature_hash(
    tx: &Transaction,
    inputs: &[ConnectedOutput],
    index: usize,
    sighash_type: SighashType,
) -> Result<Hash256, SighashError> {
    if index >= tx.inputs.len() || index >= inputs.len() {
        return Err(SighashError::InputIndexOutOfRange {
            index,
            input_count: tx.inputs.len(),
        });
    }
    if sighash_type.base == SighashBase::Single && index >= tx.outputs.len() {
        return Err(SighashError::SingleWithoutMatchingOutput {
            index,
            output_count: tx.outputs.len(),
        });
    }

    let mut writer = sha256d::Writer::default();
    tx.version.bitcoin_serialize(&mut writer).expect("infallible");

    write_inputs(tx, inputs, index, sighash_type, &mut writer);
    write_outputs(tx, index, sighash_type, &mut writer);

    tx.lock_time.bitcoin_serialize(&mut writer).expect("infallible");
    sighash_type
        .as_u32()
        .bitcoin_serialize(&mut writer)
        .expect("infallible");

    Ok(Hash256(writer.finish()))
}

fn write_inputs(
    tx: &Transaction,
    inputs: &[ConnectedOutput],
    index: usize,
    sighash_type: SighashType,
    writer: &mut sha256d::Writer,
) {
    use crate::compactint::CompactInt;

    if sighash_type.anyone_can_pay {
        CompactInt::from(1)
            .bitcoin_serialize(&mut *writer)
            .expect("infallible");
        write_input(
            &tx.inputs[index],
            inputs[index].script,
            tx.inputs[index].sequence,
            writer,
        );
        return;
    }

    CompactInt::from(tx.inputs.len())
        .bitcoin_serialize(&mut *writer)
        .expect("infallible");
    for (i, input) in tx.inputs.iter().enumerate() {
        if i == index {
            write_input(input, inputs[i].script, input.sequence, writer);
        } else {
            let sequence = match sighash_type.base {
                SighashBase::All => input.sequence,
                SighashBase::None | SighashBase::Single => 0,
            };
            write_input(input, &Script(Vec::new()), sequence, writer);
        }
    }
}

fn write_input(
    input: &crate::transparent::TransactionInput,
    script: &Script,
    sequence: u32,
    writer: &mut sha256d::Writer,
) {
    input
        .previous_output
        .bitcoin_serialize(&mut *writer)
        .expect("infallible");
    script.bitcoin_serialize(&mut *writer).expect("infallible");
    sequence.bitcoin_serialize(writer).expect("infallible");
}

fn write_outputs(
    tx: &Transaction,
    index: usize,
    sighash_type: SighashType,
    writer: &mut sha256d::Writer,
) {
    use crate::compactint::CompactInt;

    match sighash_type.base {
        SighashBase::All => {
            tx.outputs.bitcoin_serialize(writer).expect("infallible");
        }
        SighashBase::None => {
            CompactInt::from(0)
                .bitcoin_serialize(writer)
                .expect("infallible");
        }
        SighashBase::Single => {
            CompactInt::from(index + 1)
                .bitcoin_serialize(&mut *writer)
                .expect("infallible");
            for _ in 0..index {
                write_placeholder_output(writer);
            }
            write_output(&tx.outputs[index], writer);
        }
    }
}

fn write_output(output: &TransactionOutput, writer: &mut sha256d::Writer) {
    output.value.bitcoin_serialize(&mut *writer).expect("infallible");
    output
        .lock_script
        .bitcoin_serialize(writer)
        .expect("infallible");
}

/// The `SIGHASH_SINGLE` placeholder: value `-1`, empty script.
fn write_placeholder_output(writer: &mut sha256d::Writer) {
    let placeholder = Amount::<NegativeAllowed>::try_from(-1).expect("-1 is always valid here");
    placeholder
        .bitcoin_serialize(&mut *writer)
        .expect("infallible");
    Script(Vec::new())
        .bitcoin_serialize(writer)
        .expect("infallible");
}
