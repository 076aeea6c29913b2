use image::{DynamicImage, GenericImageView};
use img_batch::job::{EncodeSpec, ResizeSpec};
use img_batch::processing::resize_image;
use img_batch::utils::is_supported_input;
use img_batch::{Dimensions, JobPlan, OutputFormat, Quality};
use proptest::prelude::*;
use std::path::Path;

proptest! {
    #[test]
    fn quality_accepts_only_1_to_100(quality in 0u8..=255u8) {
        let result = Quality::new(quality);
        if (1..=100).contains(&quality) {
            prop_assert_eq!(result.unwrap().value(), quality);
        } else {
            prop_assert!(result.is_err());
        }
    }

    #[test]
    fn dimensions_parse_and_display_agree(width in 1u32..=5000u32, height in 1u32..=5000u32) {
        let dims: Dimensions = format!("{}x{}", width, height).parse().unwrap();
        prop_assert_eq!((dims.width, dims.height), (width, height));
        prop_assert_eq!(dims.to_string(), format!("{}x{}", width, height));
    }

    #[test]
    fn cover_resize_hits_exact_box(
        width in 8u32..=300u32,
        height in 8u32..=300u32,
        target_w in 1u32..=200u32,
        target_h in 1u32..=200u32
    ) {
        let img = DynamicImage::new_rgb8(width, height);
        let resized = resize_image(&img, Some(target_w), Some(target_h)).unwrap();
        prop_assert_eq!(resized.dimensions(), (target_w, target_h));
    }

    #[test]
    fn width_only_resize_keeps_aspect(
        width in 10u32..=400u32,
        height in 10u32..=400u32,
        new_width in 1u32..=400u32
    ) {
        let img = DynamicImage::new_rgb8(width, height);
        let resized = resize_image(&img, Some(new_width), None).unwrap();
        let (w, h) = resized.dimensions();
        let expected = ((new_width as f64 * height as f64) / width as f64).round().max(1.0) as u32;
        prop_assert_eq!(w, new_width);
        prop_assert_eq!(h, expected);
    }

    #[test]
    fn output_names_are_stable_and_distinct(stem in "[a-zA-Z0-9_]{1,12}") {
        let plan = JobPlan::default();
        let first: Vec<String> = plan.jobs().iter().map(|j| j.output_file_name(&stem)).collect();
        let second: Vec<String> = plan.jobs().iter().map(|j| j.output_file_name(&stem)).collect();
        prop_assert_eq!(&first, &second);

        let mut unique = first.clone();
        unique.sort();
        unique.dedup();
        prop_assert_eq!(unique.len(), first.len());
        prop_assert!(first.iter().all(|name| name.starts_with(stem.as_str())));
    }

    #[test]
    fn repeated_formats_never_collide(qualities in prop::collection::vec(1u8..=100u8, 1..4)) {
        let mut encodes = Vec::new();
        let mut seen = std::collections::HashSet::new();
        for q in qualities {
            if seen.insert(q) {
                encodes.push(EncodeSpec::new(OutputFormat::Jpeg, q).unwrap());
            }
        }
        let plan = JobPlan::from_parts(None, &[], &encodes, &[]);
        prop_assert!(plan.is_ok());
        prop_assert_eq!(plan.unwrap().len(), encodes.len());
    }

    #[test]
    fn input_extensions_are_case_insensitive(
        name in "[a-z0-9_]{1,10}",
        ext in prop::sample::select(vec!["jpg", "JPG", "jpeg", "JpEg", "png", "PNG"])
    ) {
        let file = format!("{}.{}", name, ext);
        prop_assert!(is_supported_input(Path::new(&file)));
    }

    #[test]
    fn other_extensions_are_ignored(
        name in "[a-z0-9_]{1,10}",
        ext in prop::sample::select(vec!["gif", "webp", "avif", "txt", "tiff", "bmp"])
    ) {
        let file = format!("{}.{}", name, ext);
        prop_assert!(!is_supported_input(Path::new(&file)));
    }

    #[test]
    fn resize_spec_rejects_zero_edges(edge in 1u32..=2000u32) {
        let zero_h = format!("{}x0", edge);
        let zero_w = format!("0x{}", edge);
        let width_only = format!("{}x", edge);
        let height_only = format!("x{}", edge);
        prop_assert!(zero_h.parse::<ResizeSpec>().is_err());
        prop_assert!(zero_w.parse::<ResizeSpec>().is_err());
        prop_assert!(width_only.parse::<ResizeSpec>().is_ok());
        prop_assert!(height_only.parse::<ResizeSpec>().is_ok());
    }
}
