//! End-to-end filter tests on the CPU backend.

use ifx_compute::{Backend, CpuDevice, FilterProcessor, FilterSession, KernelSource};
use ifx_core::{FilterId, HostImage, Pixel};

fn sample() -> Vec<Pixel> {
    vec![
        Pixel::rgb(10, 20, 30),
        Pixel::rgb(200, 100, 50),
        Pixel::new(0, 0, 0, 128),
        Pixel::rgb(255, 255, 255),
    ]
}

fn session(pixels: &[Pixel], w: u32, h: u32) -> FilterSession<CpuDevice> {
    FilterSession::new(CpuDevice::new(), &KernelSource::embedded(), pixels, w, h).unwrap()
}

fn luma(p: Pixel) -> u8 {
    let l = 0.299 * p.red as f32 + 0.587 * p.green as f32 + 0.114 * p.blue as f32;
    (l + 0.5).floor().clamp(0.0, 255.0) as u8
}

#[test]
fn test_invert() {
    let original = sample();
    let mut px = original.clone();
    let mut s = session(&px, 2, 2);
    s.dispatch(FilterId::Invert, &mut px).unwrap();

    for (out, inp) in px.iter().zip(&original) {
        assert_eq!(out.red, 255 - inp.red);
        assert_eq!(out.green, 255 - inp.green);
        assert_eq!(out.blue, 255 - inp.blue);
        assert_eq!(out.alpha, inp.alpha);
    }
}

#[test]
fn test_gray() {
    let original = sample();
    let mut px = original.clone();
    let mut s = session(&px, 2, 2);
    s.dispatch(FilterId::Gray, &mut px).unwrap();

    for (out, inp) in px.iter().zip(&original) {
        assert_eq!(out.red, out.green);
        assert_eq!(out.green, out.blue);
        assert_eq!(out.red, luma(*inp));
    }
    assert_eq!(px[3], Pixel::WHITE);
    assert_eq!(px[2].red, 0);
}

#[test]
fn test_channel_extraction() {
    let original = sample();
    let cases = [
        (FilterId::RedChannel, [true, false, false]),
        (FilterId::GreenChannel, [false, true, false]),
        (FilterId::BlueChannel, [false, false, true]),
    ];
    for (filter, keep) in cases {
        let mut px = original.clone();
        let mut s = session(&px, 2, 2);
        s.dispatch(filter, &mut px).unwrap();
        for (out, inp) in px.iter().zip(&original) {
            let expect = |k: bool, v: u8| if k { v } else { 0 };
            assert_eq!(out.red, expect(keep[0], inp.red), "{filter}");
            assert_eq!(out.green, expect(keep[1], inp.green), "{filter}");
            assert_eq!(out.blue, expect(keep[2], inp.blue), "{filter}");
        }
    }
}

#[test]
fn test_binary_output_is_black_or_white() {
    let mut px = sample();
    let mut s = session(&px, 2, 2);
    s.dispatch(FilterId::GrayToBinary, &mut px).unwrap();
    for p in &px {
        assert!(p.red == 0 || p.red == 255);
        assert_eq!((p.red, p.red), (p.green, p.blue));
    }
    assert_eq!(px[3].red, 255);
    assert_eq!(px[0].red, 0);
}

#[test]
fn test_length_unchanged_for_every_filter() {
    for filter in FilterId::ALL {
        let mut px = vec![Pixel::rgb(90, 60, 30); 12];
        let mut s = session(&px, 4, 3);
        s.dispatch(filter, &mut px).unwrap();
        assert_eq!(px.len(), 12, "{filter}");
    }
}

#[test]
fn test_two_dispatches_restore_roles() {
    let mut px = sample();
    let mut s = session(&px, 2, 2);
    let before = s.input_slot();
    s.dispatch(FilterId::Sepia, &mut px).unwrap();
    assert_ne!(s.input_slot(), before);
    s.dispatch(FilterId::Acos, &mut px).unwrap();
    assert_eq!(s.input_slot(), before);
}

#[test]
fn test_filters_chain_through_device_buffers() {
    let original = sample();
    let mut px = original.clone();
    let mut s = session(&px, 2, 2);
    s.dispatch(FilterId::Invert, &mut px).unwrap();
    // Host edits between dispatches are not uploaded.
    px.fill(Pixel::BLACK);
    s.dispatch(FilterId::Invert, &mut px).unwrap();
    assert_eq!(px, original);
}

#[test]
fn test_blur_keeps_flat_image() {
    let mut px = vec![Pixel::rgb(40, 80, 160); 25];
    let mut s = session(&px, 5, 5);
    let stats = s.dispatch(FilterId::GaussianBlur, &mut px).unwrap();
    assert_eq!(stats.global_size, 100);
    assert!(px.iter().all(|p| *p == Pixel::rgb(40, 80, 160)));
}

#[test]
fn test_blur_spreads_a_bright_pixel() {
    let mut px = vec![Pixel::BLACK; 49];
    px[24] = Pixel::WHITE;
    let mut s = session(&px, 7, 7);
    s.dispatch(FilterId::GaussianBlur, &mut px).unwrap();

    let centre = px[24].red;
    assert!(centre > 0 && centre < 255);
    assert!(px[23].red > 0);
    assert!(px[23].red <= centre);
    assert_eq!(px[23].alpha, 255);
}

#[test]
fn test_standard_filter_after_blur_gets_true_count() {
    let mut px = vec![Pixel::rgb(1, 2, 3); 6];
    let mut s = session(&px, 3, 2);
    let blur = s.dispatch(FilterId::GaussianBlur, &mut px).unwrap();
    let invert = s.dispatch(FilterId::Invert, &mut px).unwrap();
    assert_eq!(blur.global_size, 24);
    assert_eq!(invert.global_size, 6);
    assert_eq!(px[5], Pixel::rgb(254, 253, 252));
}

fn gradient(w: u32, h: u32) -> Vec<Pixel> {
    (0..w * h)
        .map(|i| Pixel::new((i * 37 % 256) as u8, (i * 11 % 256) as u8, (255 - i * 5 % 256) as u8, 200))
        .collect()
}

#[test]
fn test_small_work_groups_match_default() {
    // 35 pixels / 140 blur items over groups of 3 leave a partial last group
    let (w, h) = (7, 5);
    let original = gradient(w, h);
    let source = KernelSource::embedded();

    let mut expected = original.clone();
    let mut default = session(&expected, w, h);
    let mut actual = original.clone();
    let device = CpuDevice::new().with_work_group_size(3);
    let mut small = FilterSession::new(device, &source, &actual, w, h).unwrap();

    for filter in [FilterId::Invert, FilterId::GaussianBlur, FilterId::Sepia] {
        default.dispatch(filter, &mut expected).unwrap();
        let stats = small.dispatch(filter, &mut actual).unwrap();
        assert_eq!(stats.local_size, 3);
        assert_eq!(actual, expected, "{filter}");
    }
    assert_ne!(actual, original);
}

#[test]
fn test_processor_on_cpu() {
    let mut img = HostImage::new(2, 2, sample()).unwrap();
    let mut proc = FilterProcessor::new(Backend::Cpu, &KernelSource::embedded(), &img).unwrap();
    proc.apply(FilterId::RedChannel, &mut img).unwrap();
    assert_eq!(img.get(1, 0), Some(Pixel::rgb(200, 0, 0)));
    proc.close();
}

#[test]
fn test_missing_kernel_file() {
    let err = FilterSession::open(CpuDevice::new(), "/nonexistent/kernels.wgsl", &sample(), 2, 2).err();
    assert_eq!(err.map(|e| e.code()), Some("source_missing"));
}

#[test]
fn test_kernel_file_on_disk() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("filters.wgsl");
    std::fs::write(&path, KernelSource::embedded().text()).unwrap();

    let mut px = sample();
    let mut s = FilterSession::open(CpuDevice::new(), &path, &px, 2, 2).unwrap();
    s.dispatch(FilterId::Sepia, &mut px).unwrap();
    assert_eq!(s.dispatch_count(), 1);
}
