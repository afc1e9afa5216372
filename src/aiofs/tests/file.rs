use std::{
    fs,
    io::{self, Read, Seek, SeekFrom, Write},
    sync::Barrier,
    thread,
};

use aiofs::{Buffer, Error, Executor, OpenFlags};

fn read_write() -> OpenFlags {
    OpenFlags::READ | OpenFlags::WRITE | OpenFlags::CREATE | OpenFlags::TRUNCATE
}

#[test]
fn write_seek_read_round_trip() -> Result<(), Error> {
    let dir = tempfile::tempdir()?;
    let ex = Executor::new(2, 16)?;

    let data = b"the quick brown fox jumps over the lazy dog";
    let file = ex.open(dir.path().join("fox.txt"), read_write(), 0o644)?;

    assert_eq!(file.write(data)?, data.len());
    assert_eq!(file.seek(SeekFrom::Start(0))?, 0);

    let mut buf = vec![0; data.len()];
    assert_eq!(file.read(&mut buf)?, data.len());
    assert_eq!(buf, data);

    file.close()
}

#[test]
fn async_buffers_come_back() -> Result<(), Error> {
    let dir = tempfile::tempdir()?;
    let ex = Executor::new(1, 4)?;
    let file = ex.open(dir.path().join("buffers.bin"), read_write(), 0o644)?;

    let mut resp = file.write_async(Buffer::owned(vec![1, 2, 3, 4])).wait()?;
    assert_eq!(resp.take()?, 4);
    assert_eq!(resp.take_buffer().unwrap().into_vec(), vec![1, 2, 3, 4]);
    drop(resp);

    assert_eq!(file.seek_async(SeekFrom::Start(1)).wait()?.take()?, 1);

    let mut resp = file.read_async(Buffer::with_len(8)).wait()?;
    assert_eq!(resp.take()?, 3);
    assert_eq!(&resp.buffer()[..3], &[2u8, 3, 4]);
    drop(resp);

    file.close()
}

#[test]
fn seek_whence() -> Result<(), Error> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("seek.txt");
    fs::write(&path, b"0123456789")?;

    let ex = Executor::new(1, 4)?;
    let file = ex.open(&path, OpenFlags::READ, 0)?;

    assert_eq!(file.seek(SeekFrom::End(-3))?, 7);
    assert_eq!(file.seek(SeekFrom::Current(-2))?, 5);

    let mut buf = [0; 2];
    file.read(&mut buf)?;
    assert_eq!(&buf, b"56");

    let err = file.seek(SeekFrom::Current(-100)).unwrap_err();
    assert!(matches!(err, Error::Io(ref e) if e.kind() == io::ErrorKind::InvalidInput));

    file.close()
}

#[test]
fn stat_and_sync() -> Result<(), Error> {
    let dir = tempfile::tempdir()?;
    let ex = Executor::new(1, 4)?;
    let file = ex.open(dir.path().join("sync.bin"), read_write(), 0o600)?;

    file.write(&[0xAB; 4096])?;
    file.sync()?;
    file.sync_async().wait()??;

    let meta = file.stat()?;
    assert!(meta.is_file());
    assert_eq!(meta.len(), 4096);

    let meta = file.stat_async().wait()?.take()?;
    assert_eq!(meta.len(), 4096);

    file.close()
}

#[test]
fn concurrent_close_happens_once() -> Result<(), Error> {
    const CALLERS: usize = 16;

    let dir = tempfile::tempdir()?;
    let ex = Executor::new(4, 32)?;
    let file = ex.open(dir.path().join("close.txt"), read_write(), 0o644)?;

    let barrier = Barrier::new(CALLERS);
    let results: Vec<_> = thread::scope(|s| {
        let handles: Vec<_> = (0..CALLERS)
            .map(|_| {
                let file = file.clone();
                let barrier = &barrier;
                s.spawn(move || {
                    barrier.wait();
                    file.close()
                })
            })
            .collect();

        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    let closed = results.iter().filter(|r| r.is_ok()).count();
    let rejected = results
        .iter()
        .filter(|r| matches!(r, Err(Error::Closed)))
        .count();

    assert_eq!(closed, 1);
    assert_eq!(rejected, CALLERS - 1);
    assert!(file.is_closed());

    // The OS file is gone, so nothing runs against it anymore.
    assert!(matches!(file.stat(), Err(Error::Closed)));
    assert!(matches!(file.close(), Err(Error::Closed)));

    Ok(())
}

#[test]
fn losing_close_never_blocks() -> Result<(), Error> {
    let dir = tempfile::tempdir()?;
    let ex = Executor::new(1, 4)?;
    let file = ex.open(dir.path().join("close.txt"), read_write(), 0o644)?;

    let first = file.close_async();
    let second = file.close_async();

    assert!(second.is_ready());
    assert!(matches!(second.wait()?, Err(Error::Closed)));
    first.wait()?
}

#[test]
fn serialized_open_read_close() -> Result<(), Error> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("f");
    let contents: Vec<u8> = (0..64).collect();
    fs::write(&path, &contents)?;

    let ex = Executor::new(1, 1)?;

    let file = ex.open_async(&path, OpenFlags::READ, 0).wait()?.take()?;
    let read = file.read_async(Buffer::with_len(10));
    let stat = file.stat_async();
    let close = file.close_async();

    // A single worker serializes everything, so the read completed
    // against the open file before the close ran.
    close.wait()??;

    let mut read = read.wait()?;
    assert_eq!(read.take()?, 10);
    assert_eq!(read.buffer(), &contents[..10]);

    assert_eq!(stat.wait()?.take()?.len(), 64);
    Ok(())
}

#[test]
fn io_traits_for_drop_in_use() -> Result<(), Error> {
    let dir = tempfile::tempdir()?;
    let src = dir.path().join("src.txt");
    let dst = dir.path().join("dst.txt");
    fs::write(&src, b"copied through std::io")?;

    let ex = Executor::new(2, 8)?;
    let mut input = ex.open(&src, OpenFlags::READ, 0)?;
    let output = ex.open(&dst, read_write(), 0o644)?;

    let copied = io::copy(&mut input, &mut &output)?;
    assert_eq!(copied, 22);

    (&output).flush()?;
    (&output).rewind()?;

    let mut roundtrip = String::new();
    (&output).read_to_string(&mut roundtrip)?;
    assert_eq!(roundtrip, "copied through std::io");

    input.close()?;
    output.close()
}

#[test]
fn dropping_last_handle_releases_the_file() -> Result<(), Error> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("dropped.txt");

    let ex = Executor::new(1, 4)?;
    let file = ex.open(&path, read_write(), 0o644)?;
    let other = file.clone();

    file.write(b"abc")?;
    drop(file);

    // The clone still refers to the same open file.
    assert_eq!(other.stat()?.len(), 3);
    drop(other);

    assert_eq!(fs::read(&path)?, b"abc");
    Ok(())
}
