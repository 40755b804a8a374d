use jp2box::{BoxError, EncodeOptions, FourCC, read_box_header, write_box_header};
use std::io::{Cursor, Seek, SeekFrom};

#[test]
fn read_standard_header() {
    let mut data = Vec::new();
    data.extend_from_slice(&12u32.to_be_bytes());
    data.extend_from_slice(b"lbl ");
    data.extend_from_slice(b"abcd");
    let mut cur = Cursor::new(data);

    let hdr = read_box_header(&mut cur).expect("read_box_header failed");
    assert_eq!(hdr.start, 0);
    assert_eq!(hdr.size, 12);
    assert_eq!(hdr.typ, FourCC(*b"lbl "));
    assert_eq!(hdr.header_size, 8);
    assert_eq!(cur.position(), 8);
}

#[test]
fn read_extended_header() {
    let mut data = vec![0u8; 4]; // leading junk, header starts at 4
    data.extend_from_slice(&1u32.to_be_bytes());
    data.extend_from_slice(b"jp2c");
    data.extend_from_slice(&20u64.to_be_bytes());
    data.extend_from_slice(&[0xff, 0x4f, 0xff, 0x51]);
    let mut cur = Cursor::new(data);
    cur.seek(SeekFrom::Start(4)).unwrap();

    let hdr = read_box_header(&mut cur).unwrap();
    assert_eq!(hdr.start, 4);
    assert_eq!(hdr.size, 20);
    assert_eq!(hdr.header_size, 16);
    assert_eq!(hdr.typ.as_u32(), 0x6A70_3263);
}

#[test]
fn open_ended_header_has_size_zero() {
    let mut cur = Cursor::new(b"\0\0\0\0jp2c\xff\x4f".to_vec());
    let hdr = read_box_header(&mut cur).unwrap();
    assert_eq!(hdr.size, 0);
    assert_eq!(hdr.header_size, 8);
}

#[test]
fn header_shorter_than_itself_is_invalid() {
    let mut cur = Cursor::new(b"\0\0\0\x05asoc".to_vec());
    assert!(matches!(
        read_box_header(&mut cur),
        Err(BoxError::InvalidLength { length: 5, .. })
    ));

    let mut data = 1u32.to_be_bytes().to_vec();
    data.extend_from_slice(b"asoc");
    data.extend_from_slice(&15u64.to_be_bytes());
    assert!(matches!(
        read_box_header(&mut Cursor::new(data)),
        Err(BoxError::InvalidLength { length: 15, .. })
    ));
}

#[test]
fn short_input_is_truncated() {
    let mut cur = Cursor::new(vec![0, 0, 0, 12, b'l']);
    match read_box_header(&mut cur) {
        Err(BoxError::TruncatedBox { typ: None, needed: 8, available: 5 }) => {}
        other => panic!("expected truncated header, got {other:?}"),
    }

    let mut cur = Cursor::new(b"\0\0\0\x01jp2c\0\0".to_vec());
    assert!(matches!(
        read_box_header(&mut cur),
        Err(BoxError::TruncatedBox { needed: 16, available: 10, .. })
    ));
}

#[test]
fn write_standard_header() {
    let mut out = Vec::new();
    write_box_header(&mut out, FourCC(*b"asoc"), 4, &EncodeOptions::default()).unwrap();
    assert_eq!(out, [0, 0, 0, 12, b'a', b's', b'o', b'c']);
}

#[test]
fn write_extended_header_only_when_needed() {
    let typ = FourCC(*b"jp2c");
    let limit = u32::MAX as u64 - 8;

    let mut out = Vec::new();
    write_box_header(&mut out, typ, limit, &EncodeOptions::default()).unwrap();
    assert_eq!(out.len(), 8);
    assert_eq!(&out[..4], &u32::MAX.to_be_bytes());

    let mut out = Vec::new();
    write_box_header(&mut out, typ, limit + 1, &EncodeOptions::default()).unwrap();
    assert_eq!(out.len(), 16);
    assert_eq!(&out[..4], &1u32.to_be_bytes());
    assert_eq!(&out[4..8], b"jp2c");
    assert_eq!(&out[8..], &(limit + 1 + 16).to_be_bytes());
}

#[test]
fn extended_header_refused_when_disabled() {
    let mut out = Vec::new();
    let options = EncodeOptions::new().with_extended_length(false);
    let res = write_box_header(&mut out, FourCC(*b"jp2c"), u32::MAX as u64, &options);
    assert!(matches!(res, Err(BoxError::EncodingOverflow { len, .. }) if len == u32::MAX as u64));
    assert!(out.is_empty());
}
