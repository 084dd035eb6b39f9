use image::{DynamicImage, GrayImage, Luma, Rgb, RgbImage, RgbaImage};
use lsb_text::{
    constants::LSB_MASK,
    imaging::to_rgb,
    steganography::{
        StegoError, TextEncoding, bits_to_bytes, build_frame, bytes_to_bits, capacity, decode,
        decode_detailed, encode, frame_bits,
    },
};
use rand::{Rng, RngCore};

/// 一个辅助函数，用于创建一个带有随机像素的 RGB 图像
fn random_image(width: u32, height: u32) -> RgbImage {
    let mut raw_pixels = vec![0u8; (width * height * 3) as usize];
    rand::rng().fill_bytes(&mut raw_pixels);
    RgbImage::from_raw(width, height, raw_pixels).expect("Buffer size must match dimensions.")
}

/// 把任意字节作为帧写入图像，用于构造非 UTF-8 或伪造的负载
fn embed_raw_frame(image: &mut RgbImage, frame: &[u8]) {
    let bits = bytes_to_bits(frame);
    image
        .pixels_mut()
        .flat_map(|pixel| pixel.0.iter_mut())
        .zip(bits)
        .for_each(|(channel, bit)| *channel = (*channel & !LSB_MASK) | bit);
}

#[test]
fn test_capacity_formula() {
    for (width, height) in [(0, 0), (0, 7), (1, 1), (10, 10), (123, 45)] {
        let image = RgbImage::new(width, height);
        assert_eq!(
            capacity(&image),
            u64::from(width) * u64::from(height) * 3
        );
    }
}

#[test]
fn test_bytes_to_bits_is_msb_first() {
    assert_eq!(bytes_to_bits(&[0b1000_0001]), vec![1, 0, 0, 0, 0, 0, 0, 1]);
    assert_eq!(bytes_to_bits(&[0x48, 0x00]).len(), 16);
    assert_eq!(&bytes_to_bits(&[0x48])[..], &[0, 1, 0, 0, 1, 0, 0, 0]);
}

#[test]
fn test_bits_to_bytes_inverts_bytes_to_bits() {
    let mut data = vec![0u8; 257];
    rand::rng().fill_bytes(&mut data);

    assert_eq!(bits_to_bytes(&bytes_to_bits(&data)).unwrap(), data);
    assert_eq!(bits_to_bytes(&[]).unwrap(), Vec::<u8>::new());
}

#[test]
fn test_bits_to_bytes_rejects_unaligned_input() {
    assert_eq!(
        bits_to_bytes(&[1, 0, 1]),
        Err(StegoError::UnalignedBits { len: 3 })
    );
}

#[test]
fn test_build_frame_prefixes_big_endian_length() {
    let frame = build_frame("Hi".as_bytes()).unwrap();
    assert_eq!(frame, vec![0, 0, 0, 2, b'H', b'i']);
    assert_eq!(build_frame(&[]).unwrap(), vec![0, 0, 0, 0]);
    assert_eq!(frame_bits(2), 48);
}

#[test]
fn test_hi_in_ten_by_ten_image() {
    let image = random_image(10, 10);

    let encoded = encode(&image, "Hi").unwrap();

    assert_eq!(encoded.used_bits, 48);
    assert_eq!(encoded.capacity_bits, 300);
    assert_eq!(encoded.image.dimensions(), (10, 10));
    assert_eq!(decode(&encoded.image).unwrap(), "Hi");
}

#[test]
fn test_round_trip_unicode_message() {
    let image = random_image(64, 48);
    let message = "Grüße, 世界! 🦀 line one\nline two\ttabbed";

    let encoded = encode(&image, message).unwrap();
    let recovered = decode_detailed(&encoded.image).unwrap();

    assert_eq!(recovered.text, message);
    assert_eq!(recovered.encoding, TextEncoding::Utf8);
}

#[test]
fn test_round_trip_random_messages() {
    let mut rng = rand::rng();
    for _ in 0..20 {
        let image = random_image(rng.random_range(4..40), rng.random_range(4..40));
        let max_chars = (capacity(&image) - 32) / 8;
        let len = rng.random_range(0..=max_chars) as usize;
        let message: String = (0..len)
            .map(|_| char::from(rng.random_range(b' '..=b'~')))
            .collect();

        let encoded = encode(&image, &message).unwrap();
        assert_eq!(decode(&encoded.image).unwrap(), message);
    }
}

#[test]
fn test_empty_message_uses_header_only() {
    let image = random_image(8, 8);

    let encoded = encode(&image, "").unwrap();

    assert_eq!(encoded.used_bits, 32);
    assert_eq!(decode(&encoded.image).unwrap(), "");
}

#[test]
fn test_exact_fit_and_one_byte_over() {
    // 8x4 = 96 bits = 32 + 8 * 8，正好容纳 8 字节
    let image = random_image(8, 4);
    assert_eq!(capacity(&image), 96);

    let encoded = encode(&image, "12345678").unwrap();
    assert_eq!(encoded.used_bits, encoded.capacity_bits);
    assert_eq!(decode(&encoded.image).unwrap(), "12345678");

    assert_eq!(
        encode(&image, "123456789").unwrap_err(),
        StegoError::CapacityExceeded {
            required: 104,
            available: 96,
        }
    );
}

#[test]
fn test_capacity_error_message_names_bits() {
    let image = random_image(2, 2);
    let err = encode(&image, "too long").unwrap_err();
    assert_eq!(
        err.to_string(),
        "Message too large. Need 96 bits but only 12 bits available."
    );
}

#[test]
fn test_encode_only_touches_frame_lsbs() {
    let image = random_image(12, 12);

    let encoded = encode(&image, "abc").unwrap();

    assert_eq!(image.dimensions(), encoded.image.dimensions());
    let before: Vec<u8> = image.pixels().flat_map(|pixel| pixel.0).collect();
    let after: Vec<u8> = encoded.image.pixels().flat_map(|pixel| pixel.0).collect();
    let used = encoded.used_bits as usize;

    for (i, (&old, &new)) in before.iter().zip(after.iter()).enumerate() {
        if i < used {
            assert_eq!(old & !LSB_MASK, new & !LSB_MASK, "channel {i} upper bits changed");
        } else {
            assert_eq!(old, new, "channel {i} beyond the frame changed");
        }
    }
}

#[test]
fn test_encode_does_not_mutate_source() {
    let image = RgbImage::from_pixel(10, 10, Rgb([0x55, 0xAA, 0x0F]));
    let snapshot = image.clone();

    let encoded = encode(&image, "x").unwrap();

    assert_eq!(image, snapshot);
    assert_ne!(encoded.image, snapshot);
}

#[test]
fn test_channel_order_is_rgb_in_raster_order() {
    // 第 31 个比特落在像素 (0, 1) 的 G 通道，第 39 个比特落在像素 (3, 1) 的 R 通道
    let image = RgbImage::from_pixel(10, 10, Rgb([0, 0, 0]));

    let encoded = encode(&image, "").unwrap();
    assert!(encoded.image.pixels().all(|pixel| pixel.0 == [0, 0, 0]));

    let encoded = encode(&image, "\u{1}").unwrap();
    let lsbs: Vec<u8> = encoded
        .image
        .pixels()
        .flat_map(|pixel| pixel.0)
        .map(|channel| channel & LSB_MASK)
        .take(40)
        .collect();
    let mut expected = vec![0u8; 40];
    expected[31] = 1;
    expected[39] = 1;
    assert_eq!(lsbs, expected);
    assert_eq!(encoded.image.get_pixel(0, 1).0, [0, 1, 0]);
    assert_eq!(encoded.image.get_pixel(3, 1).0, [1, 0, 0]);
}

#[test]
fn test_undersized_image_fails_decode() {
    // 3x3 = 27 bits < 32
    let image = random_image(3, 3);
    assert_eq!(
        decode(&image),
        Err(StegoError::UndersizedImage { capacity: 27 })
    );
    assert_eq!(
        decode(&RgbImage::new(0, 0)),
        Err(StegoError::UndersizedImage { capacity: 0 })
    );
}

#[test]
fn test_corrupted_header_is_detected() {
    let image = random_image(10, 10);
    let mut encoded = encode(&image, "Hi").unwrap().image;

    // 将头部改写为一个远超容量的长度
    embed_raw_frame(&mut encoded, &0xFFFF_FF00u32.to_be_bytes());

    assert_eq!(
        decode(&encoded),
        Err(StegoError::TruncatedOrForeignData {
            declared: 0xFFFF_FF00,
            available: 300,
        })
    );
}

#[test]
fn test_header_one_byte_beyond_capacity_is_detected() {
    // 8x4 = 96 bits 最多容纳 8 字节负载
    let mut image = random_image(8, 4);
    embed_raw_frame(&mut image, &9u32.to_be_bytes());

    assert!(matches!(
        decode(&image),
        Err(StegoError::TruncatedOrForeignData { declared: 9, .. })
    ));
}

#[test]
fn test_invalid_utf8_falls_back_to_latin1() {
    let mut image = random_image(10, 10);
    embed_raw_frame(&mut image, &[0, 0, 0, 3, 0xFF, b'A', 0xE9]);

    let recovered = decode_detailed(&image).unwrap();

    assert_eq!(recovered.encoding, TextEncoding::Latin1);
    assert_eq!(recovered.text, "\u{FF}A\u{E9}");
    assert_eq!(decode(&image).unwrap(), "ÿAé");
}

#[test]
fn test_grayscale_input_behaves_like_rgb() {
    let gray = GrayImage::from_fn(9, 7, |x, y| Luma([(x * 31 + y * 17) as u8]));
    let rgb = to_rgb(DynamicImage::ImageLuma8(gray));

    assert_eq!(capacity(&rgb), 9 * 7 * 3);
    let encoded = encode(&rgb, "gray").unwrap();
    assert_eq!(decode(&encoded.image).unwrap(), "gray");
}

#[test]
fn test_rgba_input_drops_alpha() {
    let rgba = RgbaImage::from_pixel(6, 6, image::Rgba([10, 20, 30, 0]));
    let rgb = to_rgb(DynamicImage::ImageRgba8(rgba));

    assert_eq!(rgb.get_pixel(5, 5).0, [10, 20, 30]);
    assert_eq!(capacity(&rgb), 108);
}
