// SPDX-License-Identifier: MIT

use linkfs::fs::table::AllocationTable;
use linkfs::*;

const RW_CREATE: OpenFlags = OpenFlags::READ_WRITE.union(OpenFlags::CREATE);

fn format_mem(buf: &mut [u8], meta: &VolumeMeta) {
    let mut io = MemDevice::with_sector_size(buf, meta.sector_size);
    LinkFormatter::new(&mut io, meta)
        .format(false)
        .expect("format failed");
}

fn chain_of(buf: &mut [u8], meta: &VolumeMeta, start: u32) -> Vec<u32> {
    let mut io = MemDevice::with_sector_size(buf, meta.sector_size);
    AllocationTable::new(meta)
        .read_chain(&mut io, meta, start)
        .expect("chain")
}

#[test]
fn test_reference_scenario() {
    let meta = VolumeMeta::new(2048 * 512).unwrap();
    let mut buf = vec![0u8; 2048 * 512];
    format_mem(&mut buf, &meta);

    let mut io = MemDevice::new(&mut buf);
    let mut vol = Volume::mount(&mut io).unwrap();
    let free0 = vol.free_blocks();
    assert_eq!(free0, 2048 - 17 - 8);

    let payload: Vec<u8> = (0..600u32).map(|i| (i % 251) as u8).collect();
    let fd = vol.open("a.txt", RW_CREATE).unwrap();
    assert_eq!(vol.write(fd, &payload).unwrap(), 600);
    assert_eq!(vol.free_blocks(), free0 - 2);

    assert_eq!(vol.tell(fd).unwrap(), 600);
    assert_eq!(vol.write(fd, b"!").unwrap(), 1);
    assert_eq!(vol.file_size(fd).unwrap(), 601);
    assert_eq!(vol.free_blocks(), free0 - 2);
    vol.close(fd).unwrap();

    let st = vol.stat("/a.txt").unwrap();
    assert_eq!(st.size, 601);
    assert_eq!(st.blocks, 2);

    let fd = vol.open("a.txt", OpenFlags::READ_ONLY).unwrap();
    let mut out = vec![0u8; 1024];
    assert_eq!(vol.read(fd, &mut out).unwrap(), 601);
    assert_eq!(&out[..600], &payload[..]);
    assert_eq!(out[600], b'!');
    vol.close(fd).unwrap();

    vol.delete("a.txt").unwrap();
    assert_eq!(vol.free_blocks(), free0);
    assert!(!vol.is_file("a.txt"));

    let rep = vol.check().unwrap();
    assert!(rep.ok(), "{}", rep.warn_and_errors());
}

#[test]
fn test_small_block_round_trip_and_remount() {
    let meta = VolumeMeta::new_custom(512, 64, 64).unwrap();
    let mut buf = vec![0u8; 512 * 64];
    format_mem(&mut buf, &meta);

    let mut model = vec![0x5Au8; 64];
    {
        let mut io = MemDevice::with_sector_size(&mut buf, 64);
        let mut vol = Volume::mount(&mut io).unwrap();
        let fd = vol.open("/f", RW_CREATE).unwrap();
        vol.write(fd, &model).unwrap();

        // Part 1 only: 10 bytes at offset 5
        vol.seek(fd, SeekFrom::Start(5)).unwrap();
        vol.write(fd, &[1u8; 10]).unwrap();
        model[5..15].copy_from_slice(&[1u8; 10]);

        // Part 2 only: three whole blocks
        let blocks: Vec<u8> = (0..192u32).map(|i| i as u8).collect();
        vol.seek(fd, SeekFrom::End(0)).unwrap();
        vol.write(fd, &blocks).unwrap();
        model.extend_from_slice(&blocks);

        // Part 3 only: one byte past an aligned offset
        vol.write(fd, &[9]).unwrap();
        model.push(9);

        // All three parts at once
        let mixed = vec![7u8; 150];
        vol.seek(fd, SeekFrom::Start(250)).unwrap();
        vol.write(fd, &mixed).unwrap();
        model.resize(400, 0);
        model[250..400].copy_from_slice(&mixed);

        vol.unmount().unwrap();
    }

    let mut io = MemDevice::with_sector_size(&mut buf, 64);
    let mut vol = Volume::mount(&mut io).unwrap();
    let fd = vol.open("f", OpenFlags::READ_ONLY).unwrap();
    assert_eq!(vol.file_size(fd).unwrap(), 400);

    let mut out = vec![0u8; 400];
    let mut got = 0;
    // Odd-sized reads cross every boundary combination.
    while got < out.len() {
        let end = (got + 37).min(out.len());
        let n = vol.read(fd, &mut out[got..end]).unwrap();
        assert!(n > 0);
        got += n;
    }
    assert_eq!(out, model);
    assert_eq!(vol.read(fd, &mut [0u8; 8]).unwrap(), 0);
    vol.close(fd).unwrap();

    let st = vol.stat("f").unwrap();
    let start = st.start_block;
    drop(vol);
    assert_eq!(chain_of(&mut buf, &meta, start).len(), 400 / 64 + 1);
}

#[test]
fn test_partition_invariant_after_churn() {
    let meta = VolumeMeta::new_custom(1024, 512, 512).unwrap();
    let mut buf = vec![0u8; 1024 * 512];
    format_mem(&mut buf, &meta);

    let mut io = MemDevice::new(&mut buf);
    let mut vol = Volume::mount(&mut io).unwrap();

    vol.mkdir("docs").unwrap();
    vol.mkdir("/docs/old").unwrap();
    for (i, len) in [0usize, 1, 511, 512, 513, 4000].iter().enumerate() {
        let fd = vol.open(&format!("/docs/f{i}"), RW_CREATE).unwrap();
        vol.write(fd, &vec![i as u8; *len]).unwrap();
        vol.close(fd).unwrap();
    }
    vol.delete("/docs/f1").unwrap();
    vol.delete("docs/f4").unwrap();
    vol.rename("/docs/f5", "big").unwrap();

    let fd = vol.open("/docs/old/x", RW_CREATE).unwrap();
    vol.write(fd, &[1u8; 2000]).unwrap();
    vol.close(fd).unwrap();

    let rep = vol.check().unwrap();
    assert!(rep.ok(), "{}", rep.warn_and_errors());

    let names: Vec<String> = vol
        .read_dir("/docs")
        .unwrap()
        .into_iter()
        .map(|i| i.name)
        .collect();
    assert_eq!(names, ["old", "f0", "f2", "f3", "big"]);
    assert_eq!(vol.stat("/docs/f0").unwrap().size, 0);
    assert_eq!(vol.stat("/docs/big").unwrap().blocks, 8);
}

#[test]
fn test_freed_blocks_are_reused_first() {
    let meta = VolumeMeta::new_custom(256, 512, 512).unwrap();
    let mut buf = vec![0u8; 256 * 512];
    format_mem(&mut buf, &meta);

    let (old_start, frontier) = {
        let mut io = MemDevice::new(&mut buf);
        let mut vol = Volume::mount(&mut io).unwrap();
        for name in ["one", "two"] {
            let fd = vol.open(name, RW_CREATE).unwrap();
            vol.write(fd, &[3u8; 1536]).unwrap();
            vol.close(fd).unwrap();
        }
        let start = vol.stat("one").unwrap().start_block;
        let frontier = vol.descriptor().next_free_block;
        vol.unmount().unwrap();
        (start, frontier)
    };
    let freed = chain_of(&mut buf, &meta, old_start);
    assert_eq!(freed.len(), 3);

    let new_start = {
        let mut io = MemDevice::new(&mut buf);
        let mut vol = Volume::mount(&mut io).unwrap();
        vol.delete("one").unwrap();
        let fd = vol.open("three", RW_CREATE).unwrap();
        vol.write(fd, &[4u8; 1536]).unwrap();
        vol.close(fd).unwrap();
        let start = vol.stat("three").unwrap().start_block;
        vol.unmount().unwrap();
        start
    };

    let reused = chain_of(&mut buf, &meta, new_start);
    assert_eq!(reused.len(), 3);
    assert_eq!(new_start, old_start);
    for block in reused {
        assert!(freed.contains(&block) || block >= frontier, "block {block}");
    }
}

#[test]
fn test_rmdir_requires_empty() {
    let meta = VolumeMeta::new_custom(256, 512, 512).unwrap();
    let mut buf = vec![0u8; 256 * 512];
    format_mem(&mut buf, &meta);
    let mut io = MemDevice::new(&mut buf);
    let mut vol = Volume::mount(&mut io).unwrap();

    vol.mkdir("d").unwrap();
    let fd = vol.open("d/x", RW_CREATE).unwrap();
    vol.close(fd).unwrap();

    let free = vol.free_blocks();
    let err = vol.rmdir("d").unwrap_err();
    assert_eq!(err, FsDirectoryError::NotEmpty);
    assert_eq!(vol.free_blocks(), free);
    assert!(vol.is_dir("d"));

    assert_eq!(vol.rmdir("d/x"), Err(FsDirectoryError::NotADirectory));
    assert_eq!(vol.delete("d"), Err(FsDirectoryError::IsADirectory));

    vol.delete("d/x").unwrap();
    vol.rmdir("d").unwrap();
    assert!(!vol.is_dir("d"));
    assert_eq!(vol.free_blocks(), free + 1 + meta.dir_blocks);
}

#[test]
fn test_working_directory() {
    let meta = VolumeMeta::new_custom(512, 512, 512).unwrap();
    let mut buf = vec![0u8; 512 * 512];
    format_mem(&mut buf, &meta);
    let mut io = MemDevice::new(&mut buf);
    let mut vol = Volume::mount(&mut io).unwrap();
    assert_eq!(vol.cwd(), "/");

    vol.mkdir("a").unwrap();
    vol.mkdir("a/b").unwrap();
    vol.set_cwd("a/b").unwrap();
    assert_eq!(vol.cwd(), "/a/b");

    // Fails after a valid first segment: previous directory kept.
    let err = vol.set_cwd("../missing/x").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
    assert_eq!(vol.cwd(), "/a/b");

    let fd = vol.open("here.txt", RW_CREATE).unwrap();
    vol.close(fd).unwrap();
    assert!(vol.is_file("/a/b/here.txt"));

    assert_eq!(vol.rmdir("/a/b"), Err(FsDirectoryError::Busy));
    // "." and ".." are never removable, even when they name the cwd.
    assert_eq!(vol.rmdir("."), Err(FsDirectoryError::InvalidName));
    assert_eq!(vol.rmdir("../b/.."), Err(FsDirectoryError::InvalidName));

    vol.rename("/a", "z").unwrap();
    assert_eq!(vol.cwd(), "/z/b");

    vol.set_cwd("..").unwrap();
    assert_eq!(vol.cwd(), "/z");
    vol.set_cwd("..").unwrap();
    vol.set_cwd("..").unwrap();
    assert_eq!(vol.cwd(), "/");
}

#[test]
fn test_second_writer_is_refused() {
    let meta = VolumeMeta::new_custom(256, 512, 512).unwrap();
    let mut buf = vec![0u8; 256 * 512];
    format_mem(&mut buf, &meta);
    let mut io = MemDevice::new(&mut buf);
    let mut vol = Volume::mount(&mut io).unwrap();

    let a = vol.open("f", RW_CREATE).unwrap();
    let err = vol.open("f", RW_CREATE).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Busy);

    let b = vol.open("f", OpenFlags::READ_ONLY).unwrap();
    assert_eq!(vol.write(a, &[1u8; 128]).unwrap(), 128);
    assert_eq!(vol.write(b, &[2u8; 128]), Err(FsFileError::AccessDenied));
    vol.write(a, &[3u8; 900]).unwrap();
    vol.close(a).unwrap();
    vol.close(b).unwrap();

    let rep = vol.check().unwrap();
    assert!(rep.ok(), "{}", rep.warn_and_errors());
    assert_eq!(vol.stat("f").unwrap().size, 1028);
}

#[test]
fn test_descriptor_pool_exhaustion() {
    let meta = VolumeMeta::new_custom(256, 512, 512).unwrap();
    let mut buf = vec![0u8; 256 * 512];
    format_mem(&mut buf, &meta);
    let mut io = MemDevice::new(&mut buf);
    let mut vol = Volume::mount_with(&mut io, VolumeOptions { max_open_files: 3 }).unwrap();

    let fds: Vec<Fd> = (0..3)
        .map(|i| vol.open(&format!("f{i}"), RW_CREATE).unwrap())
        .collect();
    let err = vol.open("f3", RW_CREATE).unwrap_err();
    assert_eq!(err, FsFileError::TooManyOpenFiles);
    assert!(!vol.is_file("f3"));
    assert_eq!(vol.open_files(), 3);

    assert_eq!(vol.delete("f1"), Err(FsDirectoryError::Busy));
    vol.close(fds[1]).unwrap();
    assert_eq!(vol.open("f3", RW_CREATE).unwrap(), fds[1]);
}

#[test]
fn test_out_of_space_is_recoverable() {
    let meta = VolumeMeta::new_custom(32, 512, 512).unwrap();
    let mut buf = vec![0u8; 32 * 512];
    format_mem(&mut buf, &meta);
    let mut io = MemDevice::new(&mut buf);
    let mut vol = Volume::mount(&mut io).unwrap();
    // 32 - descriptor - table - root directory
    assert_eq!(vol.free_blocks(), 22);

    let fd = vol.open("fill", RW_CREATE).unwrap();
    let err = vol.write(fd, &vec![1u8; 512 * 30]).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::OutOfSpace);
    assert_eq!(vol.file_size(fd).unwrap(), 512 * 22);
    assert_eq!(vol.free_blocks(), 0);
    vol.close(fd).unwrap();

    assert_eq!(
        vol.mkdir("more").unwrap_err().kind(),
        ErrorKind::OutOfSpace
    );
    let rep = vol.check().unwrap();
    assert!(rep.ok(), "{}", rep.warn_and_errors());

    vol.delete("fill").unwrap();
    let fd = vol.open("small", RW_CREATE).unwrap();
    vol.write(fd, b"fits").unwrap();
    vol.close(fd).unwrap();
    assert_eq!(vol.free_blocks(), 21);
}

#[test]
fn test_mount_rejects_bad_volumes() {
    let meta = VolumeMeta::new_custom(64, 512, 512).unwrap();
    let mut buf = vec![0u8; 64 * 512];
    {
        let mut io = MemDevice::new(&mut buf);
        assert_eq!(
            Volume::mount(&mut io).err(),
            Some(FsMountError::NotFormatted)
        );
    }

    format_mem(&mut buf, &meta);
    buf[40] ^= 1;
    let mut io = MemDevice::new(&mut buf);
    assert_eq!(Volume::mount(&mut io).err(), Some(FsMountError::BadChecksum));
}

#[test]
fn test_file_backed_remount() {
    let meta = VolumeMeta::new_custom(1024, 1024, 512).unwrap();
    let mut file = tempfile::tempfile().expect("tempfile failed");
    file.set_len(1024 * 1024).expect("set_len failed");

    {
        let mut dev = StdDevice::from_file(&mut file, 512).unwrap();
        let mut vol = Volume::open_or_format(&mut dev, &meta).unwrap();
        vol.mkdir("/logs").unwrap();
        let fd = vol.open("/logs/today", RW_CREATE).unwrap();
        vol.write(fd, &[0xC3u8; 5000]).unwrap();
        vol.unmount().unwrap();
    }

    let mut dev = StdDevice::from_file(&mut file, 512).unwrap();
    // Already formatted: nothing is erased.
    let mut vol = Volume::open_or_format(&mut dev, &meta).unwrap();
    assert_eq!(vol.meta(), &meta);

    let items = vol.read_dir("/logs").unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].name, "today");
    assert_eq!(items[0].size, 5000);
    assert_eq!(items[0].kind, RecordKind::File);
    assert_eq!(items[0].start_lba % 2, 0);

    let fd = vol.open("/logs/today", OpenFlags::READ_ONLY).unwrap();
    let mut out = vec![0u8; 6000];
    assert_eq!(vol.read(fd, &mut out).unwrap(), 5000);
    assert!(out[..5000].iter().all(|&b| b == 0xC3));

    let rep = vol.check().unwrap();
    assert!(rep.ok(), "{}", rep.warn_and_errors());
}
