use criterion::{Criterion, criterion_group, criterion_main};

use linkfs::*;

criterion_group!(benches, linkfs_component_bench, linkfs_file_bench);
criterion_main!(benches);

const SIZE_BYTES: u64 = 8 * 1024 * 1024;

pub fn linkfs_component_bench(c: &mut Criterion) {
    set_log_level(LogLevel::Quiet);
    let meta = VolumeMeta::new(SIZE_BYTES).expect("meta");
    let mut buf = vec![0u8; SIZE_BYTES as usize];
    let mut mem_io = MemDevice::new(&mut buf);

    c.bench_function("linkfs_format", |b| {
        b.iter(|| {
            let mut formatter = LinkFormatter::new(&mut mem_io, &meta);
            formatter.format(false).expect("format failed");
        });
    });

    c.bench_function("linkfs_tree_churn", |b| {
        b.iter(|| {
            LinkFormatter::new(&mut mem_io, &meta)
                .format(false)
                .expect("format failed");
            let mut vol = Volume::mount(&mut mem_io).expect("mount failed");
            for d in 0..8 {
                let dir = format!("/d{d}");
                vol.mkdir(&dir).expect("mkdir failed");
                for f in 0..16 {
                    let fd = vol
                        .open(&format!("{dir}/f{f}"), OpenFlags::WRITE_ONLY | OpenFlags::CREATE)
                        .expect("open failed");
                    vol.write(fd, &[f as u8; 700]).expect("write failed");
                    vol.close(fd).expect("close failed");
                }
            }
            vol.check().expect("check failed");
        });
    });
}

pub fn linkfs_file_bench(c: &mut Criterion) {
    set_log_level(LogLevel::Quiet);
    let meta = VolumeMeta::new(SIZE_BYTES).expect("meta");
    let data = vec![0xA5u8; 1024 * 1024];

    let mut buf = vec![0u8; SIZE_BYTES as usize];
    let mut mem_io = MemDevice::new(&mut buf);

    c.bench_function("linkfs_write_1mib_mem", |b| {
        b.iter(|| {
            let mut vol = Volume::open_or_format(&mut mem_io, &meta).expect("mount failed");
            let _ = vol.delete("/blob");
            let fd = vol
                .open("/blob", OpenFlags::READ_WRITE | OpenFlags::CREATE)
                .expect("open failed");
            vol.write(fd, &data).expect("write failed");
            vol.unmount().expect("unmount failed");
        });
    });

    let mut out = vec![0u8; data.len()];
    c.bench_function("linkfs_read_1mib_mem", |b| {
        b.iter(|| {
            let mut vol = Volume::mount(&mut mem_io).expect("mount failed");
            let fd = vol.open("/blob", OpenFlags::READ_ONLY).expect("open failed");
            vol.read(fd, &mut out).expect("read failed");
            vol.close(fd).expect("close failed");
        });
    });

    let mut file = tempfile::tempfile().expect("tempfile failed");
    file.set_len(SIZE_BYTES).expect("set_len failed");
    let mut temp_io = StdDevice::from_file(&mut file, 512).expect("device failed");

    c.bench_function("linkfs_write_1mib_file", |b| {
        b.iter(|| {
            LinkFormatter::new(&mut temp_io, &meta)
                .format(false)
                .expect("format failed");
            let mut vol = Volume::mount(&mut temp_io).expect("mount failed");
            let fd = vol
                .open("/blob", OpenFlags::WRITE_ONLY | OpenFlags::CREATE)
                .expect("open failed");
            vol.write(fd, &data).expect("write failed");
            vol.unmount().expect("unmount failed");
        });
    });
}
