//! The deprecated `alert` message (spec.md §4.3): a signed broadcast the
//! network used for out-of-band warnings before it was retired. Parsed in
//! full here because it's one of the 21 required commands; signature
//! verification is left to the listener, exactly as spec.md directs.

use std::io;

use btcproto_chain::serialization::{BitcoinDeserialize, BitcoinSerialize, SerializationError};

/// The signed alert payload: the fields an alert's signature commits to.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AlertPayload {
    pub version: i32,
    pub relay_until: i64,
    pub expiration: i64,
    pub id: i32,
    pub cancel: i32,
    pub set_cancel: Vec<i32>,
    pub min_ver: i32,
    pub max_ver: i32,
    pub set_sub_ver: Vec<String>,
    pub priority: i32,
    pub comment: String,
    pub status_bar: String,
    pub reserved: String,
}

impl BitcoinSerialize for AlertPayload {
    fn bitcoin_serialize<W: io::Write>(&self, mut target: W) -> Result<(), io::Error> {
        self.version.bitcoin_serialize(&mut target)?;
        self.relay_until.bitcoin_serialize(&mut target)?;
        self.expiration.bitcoin_serialize(&mut target)?;
        self.id.bitcoin_serialize(&mut target)?;
        self.cancel.bitcoin_serialize(&mut target)?;
        self.set_cancel.bitcoin_serialize(&mut target)?;
        self.min_ver.bitcoin_serialize(&mut target)?;
        self.max_ver.bitcoin_serialize(&mut target)?;
        self.set_sub_ver.bitcoin_serialize(&mut target)?;
        self.priority.bitcoin_serialize(&mut target)?;
        self.comment.bitcoin_serialize(&mut target)?;
        self.status_bar.bitcoin_serialize(&mut target)?;
        self.reserved.bitcoin_serialize(&mut target)
    }
}

impl BitcoinDeserialize for AlertPayload {
    fn bitcoin_deserialize<R: io::Read>(mut reader: R) -> Result<Self, SerializationError> {
        Ok(AlertPayload {
            version: i32::bitcoin_deserialize(&mut reader)?,
            relay_until: i64::bitcoin_deserialize(&mut reader)?,
            expiration: i64::bitcoin_deserialize(&mut reader)?,
            id: i32::bitcoin_deserialize(&mut reader)?,
            cancel: i32::bitcoin_deserialize(&mut reader)?,
            set_cancel: Vec::<i32>::bitcoin_deserialize(&mut reader)?,
            min_ver: i32::bitcoin_deserialize(&mut reader)?,
            max_ver: i32::bitcoin_deserialize(&mut reader)?,
            set_sub_ver: Vec::<String>::bitcoin_deserialize(&mut reader)?,
            priority: i32::bitcoin_deserialize(&mut reader)?,
            comment: String::bitcoin_deserialize(&mut reader)?,
            status_bar: String::bitcoin_deserialize(&mut reader)?,
            reserved: String::bitcoin_deserialize(&mut reader)?,
        })
    }
}

/// The `alert` message proper: the serialized payload plus its signature,
/// each length-prefixed independently so the signature can commit to the
/// exact payload bytes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Alert {
    pub payload: AlertPayload,
    pub signature: Vec<u8>,
}

impl BitcoinSerialize for Alert {
    fn bitcoin_serialize<W: io::Write>(&self, mut target: W) -> Result<(), io::Error> {
        self.payload.bitcoin_serialize_to_vec()?.bitcoin_serialize(&mut target)?;
        self.signature.bitcoin_serialize(target)
    }
}

impl BitcoinDeserialize for Alert {
    fn bitcoin_deserialize<R: io::Read>(mut reader: R) -> Result<Self, SerializationError> {
        let payload_bytes = Vec::<u8>::bitcoin_deserialize(&mut reader)?;
        let payload = AlertPayload::bitcoin_deserialize(&payload_bytes[..])?;
        let signature = Vec::<u8>::bitcoin_deserialize(&mut reader)?;
        Ok(Alert { payload, signature })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Alert {
        Alert {
            payload: AlertPayload {
                version: 1,
                relay_until: 2,
                expiration: 3,
                id: 1,
                cancel: 0,
                set_cancel: vec![],
                min_ver: 0,
                max_ver: 70015,
                set_sub_ver: vec![],
                priority: 100,
                comment: String::new(),
                status_bar: "urgent: upgrade".to_owned(),
                reserved: String::new(),
            },
            signature: vec![0xde, 0xad, 0xbe, 0xef],
        }
    }

    #[test]
    fn round_trips_through_wire_encoding() {
        let alert = sample();
        let bytes = alert.bitcoin_serialize_to_vec().unwrap();
        let parsed = Alert::bitcoin_deserialize(&bytes[..]).unwrap();
        assert_eq!(parsed, alert);
    }
}
