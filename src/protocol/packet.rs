//! Fixed-length radio packets
//!
//! A frame is cut into 16-byte packets for the radio:
//!
//! ```text
//! [ADDRESS (1)] [SEQUENCE_NO (1)] [TOTAL_PACKETS (1)] [DATA (13)]
//! ```
//!
//! Sequence numbers count from one. The last packet is zero padded. Padding is
//! indistinguishable from trailing zero bytes, so reassembly needs the true payload
//! length from outside the packets; for frames that is the frame header's length byte.

use std::collections::HashMap;

use tracing::{debug, trace};

use super::codec::{self, frame_len};
use super::metrics::{Direction, Metrics};
use super::{
    Error, FC_RADIO_ADDRESS, MAX_PACKETS, Message, PACKET_DATA_SIZE, PACKET_HEADER_SIZE,
    PACKET_SIZE, PacketSetFault, Result,
};

/// One radio packet
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Packet {
    address: u8,
    sequence_no: u8,
    total_packets: u8,
    data: [u8; PACKET_DATA_SIZE],
}

impl Packet {
    /// Create a packet from its parts
    #[must_use]
    pub const fn new(address: u8, sequence_no: u8, total_packets: u8, data: [u8; PACKET_DATA_SIZE]) -> Self {
        Self {
            address,
            sequence_no,
            total_packets,
            data,
        }
    }

    /// Radio address
    #[must_use]
    pub const fn address(&self) -> u8 {
        self.address
    }

    /// Position in the transmission, starting at one
    #[must_use]
    pub const fn sequence_no(&self) -> u8 {
        self.sequence_no
    }

    /// Packets in the transmission
    #[must_use]
    pub const fn total_packets(&self) -> u8 {
        self.total_packets
    }

    /// Data bytes, including any padding
    #[must_use]
    pub const fn data(&self) -> &[u8; PACKET_DATA_SIZE] {
        &self.data
    }

    /// Convert to bytes
    #[must_use]
    pub fn to_bytes(&self) -> [u8; PACKET_SIZE] {
        let mut bytes = [0u8; PACKET_SIZE];
        bytes[0] = self.address;
        bytes[1] = self.sequence_no;
        bytes[2] = self.total_packets;
        bytes[PACKET_HEADER_SIZE..].copy_from_slice(&self.data);
        bytes
    }

    /// Parse from the first [`PACKET_SIZE`] bytes
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < PACKET_SIZE {
            return Err(Error::TruncatedPacket {
                needed: PACKET_SIZE,
                got: bytes.len(),
            });
        }

        let mut data = [0u8; PACKET_DATA_SIZE];
        data.copy_from_slice(&bytes[PACKET_HEADER_SIZE..PACKET_SIZE]);
        Ok(Self {
            address: bytes[0],
            sequence_no: bytes[1],
            total_packets: bytes[2],
            data,
        })
    }
}

/// Number of packets needed for `len` bytes; an empty payload still takes one
#[must_use]
pub const fn packet_count(len: usize) -> usize {
    if len == 0 { 1 } else { len.div_ceil(PACKET_DATA_SIZE) }
}

/// Split `payload` into packets addressed to `address`
pub fn fragment(payload: &[u8], address: u8) -> Result<Vec<Packet>> {
    let count = packet_count(payload.len());
    let total_packets = u8::try_from(count).map_err(|_| Error::TooManyPackets {
        size: payload.len(),
        packets: count,
        max: MAX_PACKETS,
    })?;

    let mut packets = Vec::with_capacity(count);
    for sequence_no in 1..=total_packets {
        let start = usize::from(sequence_no - 1) * PACKET_DATA_SIZE;
        let end = (start + PACKET_DATA_SIZE).min(payload.len());
        let mut data = [0u8; PACKET_DATA_SIZE];
        if start < end {
            data[..end - start].copy_from_slice(&payload[start..end]);
        }
        packets.push(Packet::new(address, sequence_no, total_packets, data));
    }

    Metrics::record_packets(Direction::Outbound, packets.len());
    trace!(address, len = payload.len(), total_packets, "fragmented payload");
    Ok(packets)
}

/// Rebuild a payload of `payload_len` bytes from a complete packet set in any order
pub fn reassemble(packets: &[Packet], payload_len: usize) -> Result<Vec<u8>> {
    let ordered = order(packets)?;
    let total_packets = ordered.len();
    check_length(payload_len, total_packets)?;

    let mut payload = Vec::with_capacity(total_packets * PACKET_DATA_SIZE);
    for packet in ordered {
        payload.extend_from_slice(&packet.data);
    }
    payload.truncate(payload_len);

    Metrics::record_packets(Direction::Inbound, total_packets);
    Ok(payload)
}

/// Rebuild a frame, taking its length from the frame header in the first packet
pub fn reassemble_frame(packets: &[Packet]) -> Result<Vec<u8>> {
    let first = packets
        .iter()
        .find(|packet| packet.sequence_no == 1)
        .ok_or_else(|| {
            incomplete(if packets.is_empty() {
                PacketSetFault::Empty
            } else {
                PacketSetFault::Missing { sequence_no: 1 }
            })
        })?;
    reassemble(packets, frame_len(&first.data)?)
}

fn order(packets: &[Packet]) -> Result<Vec<&Packet>> {
    let first = packets
        .first()
        .ok_or_else(|| incomplete(PacketSetFault::Empty))?;
    let total_packets = first.total_packets;
    let mut slots: Vec<Option<&Packet>> = vec![None; usize::from(total_packets)];

    for packet in packets {
        if packet.address != first.address {
            return Err(incomplete(PacketSetFault::AddressMismatch {
                expected: first.address,
                found: packet.address,
            }));
        }
        if packet.total_packets != total_packets {
            return Err(incomplete(PacketSetFault::TotalMismatch {
                expected: total_packets,
                found: packet.total_packets,
            }));
        }
        let slot = slot_index(packet.sequence_no, total_packets)?;
        if slots[slot].replace(packet).is_some() {
            return Err(incomplete(PacketSetFault::Duplicate {
                sequence_no: packet.sequence_no,
            }));
        }
    }

    let mut ordered = Vec::with_capacity(slots.len());
    for (index, slot) in slots.into_iter().enumerate() {
        match slot {
            Some(packet) => ordered.push(packet),
            None => {
                return Err(incomplete(PacketSetFault::Missing {
                    sequence_no: sequence_at(index),
                }));
            }
        }
    }
    Ok(ordered)
}

fn slot_index(sequence_no: u8, total_packets: u8) -> Result<usize> {
    if sequence_no == 0 || sequence_no > total_packets {
        return Err(incomplete(PacketSetFault::OutOfRange {
            sequence_no,
            total_packets,
        }));
    }
    Ok(usize::from(sequence_no - 1))
}

fn sequence_at(index: usize) -> u8 {
    // Slots never exceed u8::MAX entries.
    u8::try_from(index + 1).unwrap_or(u8::MAX)
}

fn check_length(len: usize, total_packets: usize) -> Result<()> {
    if packet_count(len) == total_packets {
        return Ok(());
    }
    Err(incomplete(PacketSetFault::LengthMismatch {
        len,
        total_packets: u8::try_from(total_packets).unwrap_or(u8::MAX),
    }))
}

fn incomplete(reason: PacketSetFault) -> Error {
    Error::IncompletePacketSet { reason }
}

/// Fragments frames for one radio address
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Packetizer {
    /// Address stamped on every packet
    pub address: u8,
}

impl Default for Packetizer {
    fn default() -> Self {
        Self {
            address: FC_RADIO_ADDRESS,
        }
    }
}

impl Packetizer {
    /// Packetizer for `address`
    #[must_use]
    pub const fn new(address: u8) -> Self {
        Self { address }
    }

    /// Split raw bytes into packets
    pub fn fragment(&self, payload: &[u8]) -> Result<Vec<Packet>> {
        fragment(payload, self.address)
    }

    /// Serialize `message` with the standard opcode table and split the frame
    pub fn fragment_message(&self, message: &Message) -> Result<Vec<Packet>> {
        let frame = codec::serialize(message)?;
        self.fragment(&frame)
    }
}

#[derive(Debug)]
struct PendingFrame {
    total_packets: u8,
    slots: Vec<Option<[u8; PACKET_DATA_SIZE]>>,
    last_sequence: u8,
}

impl PendingFrame {
    fn new(total_packets: u8) -> Self {
        Self {
            total_packets,
            slots: vec![None; usize::from(total_packets)],
            last_sequence: 0,
        }
    }

    fn received(&self) -> usize {
        self.slots.iter().flatten().count()
    }

    fn is_complete(&self) -> bool {
        self.slots.iter().all(Option::is_some)
    }

    /// Forget `slot` and everything after it
    fn truncate_from(&mut self, slot: usize) {
        for held in &mut self.slots[slot..] {
            *held = None;
        }
    }
}

/// Collects packets as they arrive and yields whole frames
///
/// One transmission is tracked per radio address. The radio sends the packets of a
/// frame in sequence order, so a sequence number at or below the last one accepted
/// starts a new transmission: slots from that number on are dropped and refilled,
/// lower slots are kept. A packet identical to the one already held for its sequence
/// number is a redelivery and is ignored. A change of `total_packets` also starts a
/// new transmission. Use [`reassemble`] for packet sets collected in arbitrary order.
#[derive(Debug, Default)]
pub struct Reassembler {
    pending: HashMap<u8, PendingFrame>,
}

impl Reassembler {
    /// Create an empty reassembler
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Addresses with a partially received frame
    #[must_use]
    pub fn pending_addresses(&self) -> Vec<u8> {
        let mut addresses: Vec<u8> = self.pending.keys().copied().collect();
        addresses.sort_unstable();
        addresses
    }

    /// Drop the partial frame for `address`, if any
    pub fn discard(&mut self, address: u8) -> bool {
        self.pending.remove(&address).is_some()
    }

    /// Accept one packet; returns the frame once every packet for its address arrived
    pub fn push(&mut self, packet: Packet) -> Result<Option<Vec<u8>>> {
        let address = packet.address;
        let slot = slot_index(packet.sequence_no, packet.total_packets)?;

        let pending = self
            .pending
            .entry(address)
            .or_insert_with(|| PendingFrame::new(packet.total_packets));
        if pending.total_packets != packet.total_packets {
            debug!(
                address,
                expected = pending.total_packets,
                found = packet.total_packets,
                "packet count changed, dropping partial frame"
            );
            *pending = PendingFrame::new(packet.total_packets);
        }

        if pending.slots[slot] == Some(packet.data) {
            trace!(address, sequence_no = packet.sequence_no, "ignoring redelivered packet");
            return Ok(None);
        }
        if packet.sequence_no <= pending.last_sequence {
            debug!(
                address,
                sequence_no = packet.sequence_no,
                last_sequence = pending.last_sequence,
                "new transmission, dropping stale packets"
            );
            pending.truncate_from(slot);
        }

        pending.slots[slot] = Some(packet.data);
        pending.last_sequence = packet.sequence_no;
        trace!(address, sequence_no = packet.sequence_no, received = pending.received(), "buffered packet");
        if !pending.is_complete() {
            return Ok(None);
        }

        let Some(done) = self.pending.remove(&address) else {
            return Ok(None);
        };
        let total_packets = done.slots.len();
        let mut bytes = Vec::with_capacity(total_packets * PACKET_DATA_SIZE);
        for data in done.slots.into_iter().flatten() {
            bytes.extend_from_slice(&data);
        }

        let len = frame_len(&bytes)?;
        check_length(len, total_packets)?;
        bytes.truncate(len);

        Metrics::record_packets(Direction::Inbound, total_packets);
        debug!(address, len, total_packets, "reassembled frame");
        Ok(Some(bytes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{Action, HelioCmd, HelioTargetPoseCmd};

    fn payload(len: usize) -> Vec<u8> {
        (0..len).map(|i| (i % 251) as u8 + 1).collect()
    }

    #[test]
    fn test_fragment_twenty_bytes() {
        let data = payload(20);
        let packets = fragment(&data, 255).unwrap();
        assert_eq!(packets.len(), 2);

        let first = packets[0].to_bytes();
        assert_eq!(&first[..3], &[255, 1, 2]);
        assert_eq!(&first[3..], &data[0..13]);

        let second = packets[1].to_bytes();
        assert_eq!(&second[..3], &[255, 2, 2]);
        assert_eq!(&second[3..10], &data[13..20]);
        assert_eq!(&second[10..], &[0, 0, 0, 0, 0, 0]);
    }

    #[test]
    fn test_roundtrip_lengths() {
        for len in [0, 1, 12, 13, 14, 130] {
            let data = payload(len);
            let packets = fragment(&data, 7).unwrap();
            assert_eq!(packets.len(), packet_count(len));
            assert!(packets.iter().all(|p| p.total_packets() as usize == packets.len()));
            assert_eq!(reassemble(&packets, len).unwrap(), data, "len {len}");
        }
    }

    #[test]
    fn test_empty_payload_is_one_padding_packet() {
        let packets = fragment(&[], 1).unwrap();
        assert_eq!(packets.len(), 1);
        assert_eq!(packets[0].to_bytes(), [1, 1, 1, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0]);
    }

    #[test]
    fn test_trailing_zeros_survive() {
        let data = vec![9, 0, 0, 0];
        let packets = fragment(&data, 1).unwrap();
        assert_eq!(reassemble(&packets, 4).unwrap(), data);
    }

    #[test]
    fn test_too_many_packets() {
        assert!(fragment(&vec![0; 255 * 13], 1).is_ok());
        assert!(matches!(
            fragment(&vec![0; 255 * 13 + 1], 1),
            Err(Error::TooManyPackets { packets: 256, .. })
        ));
    }

    #[test]
    fn test_out_of_order_reassembly() {
        let data = payload(40);
        let mut packets = fragment(&data, 3).unwrap();
        packets.reverse();
        assert_eq!(reassemble(&packets, 40).unwrap(), data);
    }

    #[test]
    fn test_missing_packet() {
        let packets = fragment(&payload(40), 3).unwrap();
        let partial = [packets[0], packets[2], packets[3]];
        assert!(matches!(
            reassemble(&partial, 40),
            Err(Error::IncompletePacketSet {
                reason: PacketSetFault::Missing { sequence_no: 2 }
            })
        ));
    }

    #[test]
    fn test_duplicate_packet() {
        let packets = fragment(&payload(20), 3).unwrap();
        let doubled = [packets[0], packets[0], packets[1]];
        assert!(matches!(
            reassemble(&doubled, 20),
            Err(Error::IncompletePacketSet {
                reason: PacketSetFault::Duplicate { sequence_no: 1 }
            })
        ));
    }

    #[test]
    fn test_disagreeing_totals() {
        let mut packets = fragment(&payload(20), 3).unwrap();
        packets[1] = Packet::new(3, 2, 3, *packets[1].data());
        assert!(matches!(
            reassemble(&packets, 20),
            Err(Error::IncompletePacketSet {
                reason: PacketSetFault::TotalMismatch { expected: 2, found: 3 }
            })
        ));
    }

    #[test]
    fn test_length_must_match_packet_count() {
        let packets = fragment(&payload(20), 3).unwrap();
        assert!(matches!(
            reassemble(&packets, 13),
            Err(Error::IncompletePacketSet {
                reason: PacketSetFault::LengthMismatch { len: 13, total_packets: 2 }
            })
        ));
        assert!(matches!(
            reassemble(&[], 0),
            Err(Error::IncompletePacketSet {
                reason: PacketSetFault::Empty
            })
        ));
    }

    #[test]
    fn test_packet_bytes_roundtrip() {
        let packet = Packet::new(255, 1, 1, [7; PACKET_DATA_SIZE]);
        assert_eq!(Packet::from_bytes(&packet.to_bytes()).unwrap(), packet);
        assert!(matches!(
            Packet::from_bytes(&[0; 15]),
            Err(Error::TruncatedPacket { needed: 16, got: 15 })
        ));
    }

    #[test]
    fn test_reassemble_frame_uses_length_byte() {
        let frame = codec::encode_frame(4, &[1, 2, 3, 0, 0]).unwrap();
        let packets = fragment(&frame, 9).unwrap();
        assert_eq!(reassemble_frame(&packets).unwrap(), frame);
    }

    fn pose_packets(address: u8, pose: HelioTargetPoseCmd) -> (Vec<u8>, Vec<Packet>) {
        let frame = codec::serialize(&Message::from(pose)).unwrap();
        let packets = fragment(&frame, address).unwrap();
        (frame, packets)
    }

    #[test]
    fn test_reassembler_in_sequence() {
        let packetizer = Packetizer::new(12);
        let frame = codec::encode_frame(5, &payload(30)).unwrap();
        let packets = packetizer.fragment(&frame).unwrap();

        let mut reassembler = Reassembler::new();
        assert_eq!(reassembler.push(packets[0]).unwrap(), None);
        assert_eq!(reassembler.push(packets[1]).unwrap(), None);
        assert_eq!(reassembler.pending_addresses(), vec![12]);
        assert_eq!(reassembler.push(packets[2]).unwrap(), Some(frame));
        assert!(reassembler.pending_addresses().is_empty());
    }

    #[test]
    fn test_reassembler_ignores_redelivery() {
        let frame = codec::encode_frame(5, &payload(20)).unwrap();
        let packets = fragment(&frame, 4).unwrap();
        let mut reassembler = Reassembler::new();
        assert_eq!(reassembler.push(packets[0]).unwrap(), None);
        assert_eq!(reassembler.push(packets[0]).unwrap(), None);
        assert_eq!(reassembler.push(packets[1]).unwrap(), Some(frame));
    }

    #[test]
    fn test_reassembler_restarts_on_conflicting_packet() {
        let a = HelioTargetPoseCmd { helio_id: 1, x: 1.0, y: 2.0, z: 3.0 };
        let b = HelioTargetPoseCmd { helio_id: 100, x: 100.0, y: 200.0, z: 300.0 };
        let (_, a_packets) = pose_packets(7, a);
        let (b_frame, b_packets) = pose_packets(7, b);
        assert_eq!(a_packets.len(), 2);

        let mut reassembler = Reassembler::new();
        assert_eq!(reassembler.push(a_packets[0]).unwrap(), None);
        assert_eq!(reassembler.push(b_packets[0]).unwrap(), None);
        let frame = reassembler.push(b_packets[1]).unwrap().unwrap();
        assert_eq!(frame, b_frame);
        assert_eq!(codec::deserialize(&frame).unwrap(), Message::from(b));
    }

    #[test]
    fn test_reassembler_recovers_after_late_redelivery() {
        let a = HelioTargetPoseCmd { helio_id: 1, x: 1.0, y: 2.0, z: 3.0 };
        let b = HelioTargetPoseCmd { helio_id: 100, x: 100.0, y: 200.0, z: 300.0 };
        let (a_frame, a_packets) = pose_packets(7, a);
        let (b_frame, b_packets) = pose_packets(7, b);

        let mut reassembler = Reassembler::new();
        reassembler.push(a_packets[0]).unwrap();
        assert_eq!(reassembler.push(a_packets[1]).unwrap(), Some(a_frame));

        // second half of A shows up again after the frame was delivered
        assert_eq!(reassembler.push(a_packets[1]).unwrap(), None);
        assert_eq!(reassembler.push(b_packets[0]).unwrap(), None);
        assert_eq!(reassembler.push(b_packets[1]).unwrap(), Some(b_frame));
    }

    #[test]
    fn test_reassembler_restart_keeps_matching_lower_slots() {
        // both frames share their first packet: opcode, length and 11 payload bytes
        let shared = payload(11);
        let a = [shared.as_slice(), &[0xA0; 20][..]].concat();
        let b = [shared.as_slice(), &[0xB0; 20][..]].concat();
        let a_packets = fragment(&codec::encode_frame(5, &a).unwrap(), 9).unwrap();
        let b_frame = codec::encode_frame(5, &b).unwrap();
        let b_packets = fragment(&b_frame, 9).unwrap();
        assert_eq!(a_packets[0], b_packets[0]);

        let mut reassembler = Reassembler::new();
        reassembler.push(a_packets[0]).unwrap();
        reassembler.push(a_packets[1]).unwrap();
        assert_eq!(reassembler.push(b_packets[0]).unwrap(), None);
        assert_eq!(reassembler.push(b_packets[1]).unwrap(), None);
        assert_eq!(reassembler.push(b_packets[2]).unwrap(), Some(b_frame));
    }

    #[test]
    fn test_reassembler_packet_count_change_starts_over() {
        let long = codec::encode_frame(5, &payload(20)).unwrap();
        let short = codec::encode_frame(0, &[1, 44, 2]).unwrap();
        let mut reassembler = Reassembler::new();
        reassembler.push(fragment(&long, 4).unwrap()[0]).unwrap();
        assert_eq!(
            reassembler.push(fragment(&short, 4).unwrap()[0]).unwrap(),
            Some(short)
        );
        assert!(!reassembler.discard(4));
    }

    #[test]
    fn test_reassembler_rejects_bad_sequence() {
        let stray = Packet::new(4, 6, 5, [0; PACKET_DATA_SIZE]);
        assert!(matches!(
            Reassembler::new().push(stray),
            Err(Error::IncompletePacketSet {
                reason: PacketSetFault::OutOfRange { sequence_no: 6, total_packets: 5 }
            })
        ));
    }

    #[test]
    fn test_packetizer_defaults_to_field_controller() {
        let packets = Packetizer::default()
            .fragment_message(&Message::from(HelioCmd::new(300, Action::Stow)))
            .unwrap();
        assert_eq!(packets.len(), 1);
        assert_eq!(
            packets[0].to_bytes(),
            [255, 1, 1, 0, 3, 1, 44, 2, 0, 0, 0, 0, 0, 0, 0, 0]
        );
    }
}
