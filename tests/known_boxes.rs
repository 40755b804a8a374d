use jp2box::known_boxes::{
    BitsPerComponentBox, ChannelDefinition, ChannelDefinitionBox, ColourData,
    ColourSpecificationBox, ComponentMappingBox, DataEntryUrlBox, FileTypeBox, ImageHeaderBox,
    PaletteBox, Resolution, SignatureBox, UuidBox, UuidListBox,
};
use jp2box::{BoxCodec, BoxError, FourCC, Jp2Box, OpaqueBox, tags};

fn parse(typ: FourCC, payload: &[u8]) -> Jp2Box {
    Jp2Box::parse(typ, payload).expect("parse failed")
}

#[test]
fn leaf_from_four_byte_payload() {
    let b = parse(tags::BITS_PER_COMPONENT, &[0x01, 0x02, 0x03, 0x04]);
    assert_eq!(b.length().unwrap(), 12);
    assert_eq!(b.type_tag(), BitsPerComponentBox::TYPE);
    assert_eq!(b.type_tag().as_u32(), 0x6270_6363);
    assert_eq!(
        b,
        Jp2Box::BitsPerComponent(BitsPerComponentBox { bit_depths: vec![1, 2, 3, 4] })
    );
}

#[test]
fn signature_box() {
    let b = parse(tags::SIGNATURE, &[0x0d, 0x0a, 0x87, 0x0a]);
    assert_eq!(b, Jp2Box::Signature(SignatureBox));
    assert_eq!(b.encode().unwrap(), b"\0\0\0\x0cjP  \r\n\x87\n");

    assert!(matches!(
        Jp2Box::parse(tags::SIGNATURE, &[0, 0, 0, 0]),
        Err(BoxError::InvalidPayload { .. })
    ));
}

#[test]
fn file_type_box() {
    let payload = b"jp2 \0\0\0\0jp2 jpx ";
    let b = parse(tags::FILE_TYPE, payload);
    let Jp2Box::FileType(ftyp) = &b else { panic!("expected ftyp, got {b:?}") };
    assert_eq!(ftyp.brand, FourCC(*b"jp2 "));
    assert_eq!(ftyp.minor_version, 0);
    assert_eq!(ftyp.compatibility, vec![FourCC(*b"jp2 "), FourCC(*b"jpx ")]);
    assert_eq!(b.compose().unwrap(), payload);

    assert!(matches!(
        FileTypeBox::parse(b"jp2 \0\0\0\0jp2"),
        Err(BoxError::InvalidPayload { .. })
    ));
}

#[test]
fn image_header_box() {
    let payload = [0, 0, 1, 0, 0, 0, 2, 0, 0, 3, 7, 7, 0, 0];
    let b = parse(tags::IMAGE_HEADER, &payload);
    assert_eq!(
        b,
        Jp2Box::ImageHeader(ImageHeaderBox {
            height: 256,
            width: 512,
            components: 3,
            bits_per_component: 7,
            compression: 7,
            colourspace_unknown: 0,
            intellectual_property: 0,
        })
    );
    assert_eq!(b.compose().unwrap(), payload);
}

#[test]
fn fixed_records_report_truncation() {
    match ImageHeaderBox::parse(&[0; 13]) {
        Err(BoxError::TruncatedBox { typ, needed: 14, available: 13 }) => {
            assert_eq!(typ, Some(tags::IMAGE_HEADER));
        }
        other => panic!("expected truncation, got {other:?}"),
    }
    assert!(matches!(
        ImageHeaderBox::parse(&[0; 15]),
        Err(BoxError::InvalidPayload { .. })
    ));
    assert!(matches!(
        ChannelDefinitionBox::parse(&[0, 2, 0, 0, 0, 0, 0, 0]),
        Err(BoxError::TruncatedBox { needed: 14, .. })
    ));
}

#[test]
fn colour_specification_variants() {
    let srgb = parse(tags::COLOUR_SPECIFICATION, &[1, 0, 0, 0, 0, 0, 16]);
    assert_eq!(
        srgb,
        Jp2Box::ColourSpecification(ColourSpecificationBox {
            precedence: 0,
            approximation: 0,
            colour: ColourData::Enumerated(16),
        })
    );

    let icc = parse(tags::COLOUR_SPECIFICATION, &[2, 0xff, 1, 0xaa, 0xbb]);
    let Jp2Box::ColourSpecification(colr) = &icc else { panic!("expected colr") };
    assert_eq!(colr.precedence, -1);
    assert_eq!(colr.colour, ColourData::Other { method: 2, data: vec![0xaa, 0xbb] });
    assert_eq!(icc.compose().unwrap(), [2, 0xff, 1, 0xaa, 0xbb]);

    assert!(matches!(
        ColourSpecificationBox::parse(&[1, 0, 0, 0, 16]),
        Err(BoxError::TruncatedBox { .. })
    ));
}

#[test]
fn palette_box_mixed_widths() {
    // 2 entries, 2 columns: unsigned 8-bit and signed 12-bit
    let payload = [0, 2, 2, 7, 0x8b, 10, 0x01, 0x02, 20, 0x0f, 0xff];
    let b = parse(tags::PALETTE, &payload);
    let Jp2Box::Palette(pclr) = &b else { panic!("expected pclr, got {b:?}") };
    assert_eq!(pclr.bit_depths, vec![7, 0x8b]);
    assert_eq!(pclr.entries, vec![vec![10, 0x0102], vec![20, 0x0fff]]);
    assert_eq!(b.compose().unwrap(), payload);

    assert!(matches!(
        PaletteBox::parse(&payload[..10]),
        Err(BoxError::TruncatedBox { .. })
    ));
}

#[test]
fn component_mapping_and_channels() {
    let cmap = ComponentMappingBox::parse(&[0, 0, 1, 0, 0, 0, 1, 1]).unwrap();
    assert_eq!(cmap.mappings.len(), 2);
    assert_eq!(cmap.mappings[1].palette_column, 1);
    assert!(matches!(
        ComponentMappingBox::parse(&[0, 0, 1]),
        Err(BoxError::InvalidPayload { .. })
    ));

    let cdef = ChannelDefinitionBox::parse(&[0, 1, 0, 3, 0, 1, 0, 0]).unwrap();
    assert_eq!(
        cdef.channels,
        vec![ChannelDefinition { index: 3, channel_type: 1, association: 0 }]
    );
}

#[test]
fn resolution_boxes() {
    let payload = [0, 3, 0, 1, 0, 3, 0, 1, 2, 2];
    let b = parse(tags::CAPTURE_RESOLUTION, &payload);
    let Jp2Box::CaptureResolution(resc) = &b else { panic!("expected resc") };
    let res: Resolution = resc.0;
    assert_eq!(res.vertical(), Some(300.0));
    assert_eq!(res.horizontal(), Some(300.0));

    let d = parse(tags::DISPLAY_RESOLUTION, &payload);
    assert_eq!(d.type_tag(), tags::DISPLAY_RESOLUTION);
    assert_eq!(d.compose().unwrap(), payload);
}

#[test]
fn text_boxes_decode_utf8() {
    let lbl = parse(tags::LABEL, "légende".as_bytes());
    assert!(matches!(&lbl, Jp2Box::Label(l) if l.text == "légende"));
    let xml = parse(tags::XML, b"<a/>");
    assert!(matches!(&xml, Jp2Box::Xml(x) if x.content == "<a/>"));
}

#[test]
fn lenient_kinds_fall_back_to_opaque() {
    let bad = [0xff, 0xfe, b'x'];
    for typ in [tags::LABEL, tags::XML] {
        let b = parse(typ, &bad);
        assert_eq!(b, Jp2Box::Opaque(OpaqueBox::new(typ, bad.to_vec())));
        assert_eq!(b.compose().unwrap(), bad);
    }

    // url without its NUL terminator
    let b = parse(tags::URL, b"\0\0\0\0http://x");
    assert!(matches!(b, Jp2Box::Opaque(ref o) if o.typ() == tags::URL));
}

#[test]
fn strict_kinds_do_not_fall_back() {
    assert!(matches!(
        Jp2Box::parse(tags::UUID, &[0; 15]),
        Err(BoxError::TruncatedBox { .. })
    ));
}

#[test]
fn uuid_boxes() {
    let mut payload = (0u8..16).collect::<Vec<_>>();
    payload.extend_from_slice(b"vendor");
    let b = parse(tags::UUID, &payload);
    let Jp2Box::Uuid(UuidBox { id, data }) = &b else { panic!("expected uuid") };
    assert_eq!(id[15], 15);
    assert_eq!(data, b"vendor");

    let mut list = vec![0, 2];
    list.extend_from_slice(&[0xaa; 16]);
    list.extend_from_slice(&[0xbb; 16]);
    let ulst = UuidListBox::parse(&list).unwrap();
    assert_eq!(ulst.ids, vec![[0xaa; 16], [0xbb; 16]]);
    assert!(matches!(
        UuidListBox::parse(&list[..20]),
        Err(BoxError::TruncatedBox { .. })
    ));
}

#[test]
fn data_entry_url_box() {
    let payload = b"\x00\x00\x00\x01file:///tmp/a.j2c\0";
    let b = DataEntryUrlBox::parse(payload).unwrap();
    assert_eq!(b.version, 0);
    assert_eq!(b.flags, 1);
    assert_eq!(b.location, "file:///tmp/a.j2c");
    let mut out = Vec::new();
    b.compose(&mut out).unwrap();
    assert_eq!(out, payload);
}

#[test]
fn codestream_is_kept_verbatim() {
    let payload = [0xff, 0x4f, 0xff, 0x51, 0x00];
    let b = parse(tags::CONTIGUOUS_CODESTREAM, &payload);
    assert!(matches!(&b, Jp2Box::Codestream(c) if c.data == payload));
    assert_eq!(b.compose().unwrap(), payload);
}

fn compose_error(b: impl Into<Jp2Box>) -> BoxError {
    let b: Jp2Box = b.into();
    assert!(b.length().is_err(), "length of {b:?} should fail");
    assert!(b.encode().is_err(), "encode of {b:?} should fail");
    b.compose().expect_err("compose should fail")
}

#[test]
fn palette_compose_rejects_wide_columns() {
    let err = compose_error(PaletteBox { bit_depths: vec![0x7f], entries: vec![vec![0]] });
    assert!(matches!(err, BoxError::InvalidPayload { typ, .. } if typ == tags::PALETTE));
}

#[test]
fn palette_compose_rejects_values_and_rows_that_do_not_fit() {
    let err = compose_error(PaletteBox { bit_depths: vec![7], entries: vec![vec![256]] });
    assert!(matches!(err, BoxError::InvalidPayload { .. }));

    let err = compose_error(PaletteBox { bit_depths: vec![7, 7], entries: vec![vec![1]] });
    assert!(matches!(err, BoxError::InvalidPayload { .. }));

    let err = compose_error(PaletteBox { bit_depths: vec![7; 256], entries: vec![] });
    assert!(matches!(err, BoxError::InvalidPayload { .. }));

    // a full 64-bit column still fits
    let wide = PaletteBox { bit_depths: vec![63], entries: vec![vec![u64::MAX]] };
    let b: Jp2Box = wide.clone().into();
    assert_eq!(Jp2Box::parse(tags::PALETTE, &b.compose().unwrap()).unwrap(), b);
}

#[test]
fn counts_past_16_bits_are_rejected() {
    let channel = ChannelDefinition { index: 0, channel_type: 0, association: 0 };
    let err = compose_error(ChannelDefinitionBox { channels: vec![channel; 65536] });
    assert!(matches!(err, BoxError::InvalidPayload { typ, .. } if typ == tags::CHANNEL_DEFINITION));

    let err = compose_error(UuidListBox { ids: vec![[0; 16]; 65536] });
    assert!(matches!(err, BoxError::InvalidPayload { .. }));

    let max = ChannelDefinitionBox { channels: vec![channel; 65535] };
    assert_eq!(Jp2Box::from(max).length().unwrap(), 8 + 2 + 65535 * 6);
}

#[test]
fn url_compose_rejects_unencodable_fields() {
    let err = compose_error(DataEntryUrlBox {
        version: 0,
        flags: 0x0100_0000,
        location: "a".into(),
    });
    assert!(matches!(err, BoxError::InvalidPayload { .. }));

    let err = compose_error(DataEntryUrlBox { version: 0, flags: 0, location: "a\0b".into() });
    assert!(matches!(err, BoxError::InvalidPayload { .. }));
}

#[test]
fn colour_other_cannot_claim_enumerated_method() {
    let err = compose_error(ColourSpecificationBox {
        precedence: 0,
        approximation: 0,
        colour: ColourData::Other { method: 1, data: vec![0, 0, 0, 16] },
    });
    assert!(matches!(err, BoxError::InvalidPayload { .. }));
}
