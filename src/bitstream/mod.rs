//! Bit-level I/O: the leaf layer everything else in the codec is built on.

mod reader;
mod writer;

pub use reader::BitReader;
pub use writer::BitWriter;

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn round_trips_bits_and_varints() {
    let mut w = BitWriter::new();
    w.write_bit(1);
    w.write_bit(0);
    w.write_bits(0b101, 3);
    w.write_byte(0xAB);
    w.write_u32(0xDEADBEEF);
    w.write_varint(300);
    w.write_varint(0);
    w.flush_byte();
    w.write_data(&[1, 2, 3]);
    let bytes = w.finalize();

    let mut r = BitReader::new(&bytes);
    assert_eq!(r.read_bit().unwrap(), 1);
    assert_eq!(r.read_bit().unwrap(), 0);
    assert_eq!(r.read_bits(3).unwrap(), 0b101);
    assert_eq!(r.read_byte().unwrap(), 0xAB);
    assert_eq!(r.read_u32().unwrap(), 0xDEADBEEF);
    assert_eq!(r.read_varint().unwrap(), 300);
    assert_eq!(r.read_varint().unwrap(), 0);
    r.skip_to_byte_alignment();
    assert_eq!(r.read_byte().unwrap(), 1);
    assert_eq!(r.read_byte().unwrap(), 2);
    assert_eq!(r.read_byte().unwrap(), 3);
  }

  #[test]
  fn write_data_is_byte_aligned_on_both_sides() {
    let mut w = BitWriter::new();
    w.write_bits(0b11, 2);
    w.write_data(&[0xFF, 0x00]);
    let bytes = w.finalize();
    // 2 bits padded to a byte, then 2 literal bytes => 3 bytes total.
    assert_eq!(bytes.len(), 3);
    assert_eq!(bytes[1], 0xFF);
    assert_eq!(bytes[2], 0x00);

    let mut r = BitReader::new(&bytes);
    assert_eq!(r.read_bits(2).unwrap(), 0b11);
    r.skip_to_byte_alignment();
    assert_eq!(r.read_byte().unwrap(), 0xFF);
    assert_eq!(r.read_byte().unwrap(), 0x00);
  }

  #[test]
  fn varint_rejects_64_bit_overshoot() {
    // 10 bytes of continuation-set groups would shift past 64 bits.
    let data = vec![0xFFu8; 10];
    let mut r = BitReader::new(&data);
    assert!(r.read_varint().is_err());
  }

  #[test]
  fn signed_varint_round_trips_negative_and_positive() {
    let mut w = BitWriter::new();
    for v in [-70000i32, -1, 0, 1, 70000] {
      w.write_signed_varint(v);
    }
    let bytes = w.finalize();
    let mut r = BitReader::new(&bytes);
    for v in [-70000i32, -1, 0, 1, 70000] {
      assert_eq!(r.read_signed_varint().unwrap(), v);
    }
  }

  #[test]
  fn reader_fails_on_truncated_stream() {
    let data: [u8; 0] = [];
    let mut r = BitReader::new(&data);
    assert!(r.read_bit().is_err());
  }
}
