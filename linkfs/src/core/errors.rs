// SPDX-License-Identifier: MIT

use core::fmt;

pub use linkio::errors::*;

/// Flat classification of every error the crate can return.
///
/// Layer errors nest (a file error may wrap a directory error wrapping an
/// allocator error); `kind()` looks through the nesting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Io,
    OutOfSpace,
    CorruptChain,
    NotFound,
    AlreadyExists,
    DirectoryFull,
    NotADirectory,
    IsADirectory,
    NotEmpty,
    Busy,
    InvalidName,
    InvalidPath,
    InvalidDescriptor,
    TooManyOpenFiles,
    AccessDenied,
    Corrupted,
    NotFormatted,
    BadChecksum,
    Invalid,
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FsAllocatorError {
    IO(BlockDevError),
    OutOfSpace,
    CorruptChain(u32),
    Other(&'static str),
}

impl FsAllocatorError {
    pub fn msg(&self) -> &'static str {
        match self {
            FsAllocatorError::IO(_) => "IO error",
            FsAllocatorError::OutOfSpace => "Out of space",
            FsAllocatorError::CorruptChain(_) => "Corrupt block chain",
            FsAllocatorError::Other(msg) => msg,
        }
    }

    pub fn source(&self) -> Option<FsError> {
        match self {
            FsAllocatorError::IO(e) => Some(FsError::IO(*e)),
            _ => None,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            FsAllocatorError::IO(_) => ErrorKind::Io,
            FsAllocatorError::OutOfSpace => ErrorKind::OutOfSpace,
            FsAllocatorError::CorruptChain(_) => ErrorKind::CorruptChain,
            FsAllocatorError::Other(_) => ErrorKind::Other,
        }
    }
}

impl fmt::Display for FsAllocatorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.msg())?;
        if let FsAllocatorError::CorruptChain(block) = self {
            write!(f, " (block: {block})")?;
        }
        let mut current = self.source();
        while let Some(src) = current {
            write!(f, "\n  caused by: {}", src.msg())?;
            current = src.source();
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FsDirectoryError {
    IO(BlockDevError),
    Allocator(FsAllocatorError),
    NotFound,
    AlreadyExists,
    DirectoryFull,
    NotADirectory,
    IsADirectory,
    NotEmpty,
    Busy,
    InvalidName,
    InvalidPath(&'static str),
    Other(&'static str),
}

impl FsDirectoryError {
    pub fn msg(&self) -> &'static str {
        match self {
            FsDirectoryError::IO(_) => "IO error",
            FsDirectoryError::Allocator(_) => "Allocator error",
            FsDirectoryError::NotFound => "No such file or directory",
            FsDirectoryError::AlreadyExists => "Name already exists",
            FsDirectoryError::DirectoryFull => "Directory is full",
            FsDirectoryError::NotADirectory => "Not a directory",
            FsDirectoryError::IsADirectory => "Is a directory",
            FsDirectoryError::NotEmpty => "Directory not empty",
            FsDirectoryError::Busy => "Entry is in use",
            FsDirectoryError::InvalidName => "Invalid name",
            FsDirectoryError::InvalidPath(msg) => msg,
            FsDirectoryError::Other(msg) => msg,
        }
    }

    pub fn source(&self) -> Option<FsError> {
        match self {
            FsDirectoryError::IO(e) => Some(FsError::IO(*e)),
            FsDirectoryError::Allocator(e) => Some(FsError::Allocator(*e)),
            _ => None,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            FsDirectoryError::IO(_) => ErrorKind::Io,
            FsDirectoryError::Allocator(e) => e.kind(),
            FsDirectoryError::NotFound => ErrorKind::NotFound,
            FsDirectoryError::AlreadyExists => ErrorKind::AlreadyExists,
            FsDirectoryError::DirectoryFull => ErrorKind::DirectoryFull,
            FsDirectoryError::NotADirectory => ErrorKind::NotADirectory,
            FsDirectoryError::IsADirectory => ErrorKind::IsADirectory,
            FsDirectoryError::NotEmpty => ErrorKind::NotEmpty,
            FsDirectoryError::Busy => ErrorKind::Busy,
            FsDirectoryError::InvalidName => ErrorKind::InvalidName,
            FsDirectoryError::InvalidPath(_) => ErrorKind::InvalidPath,
            FsDirectoryError::Other(_) => ErrorKind::Other,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FsFileError {
    IO(BlockDevError),
    Allocator(FsAllocatorError),
    Directory(FsDirectoryError),
    InvalidDescriptor,
    TooManyOpenFiles,
    AccessDenied,
    Corrupted(&'static str),
    Other(&'static str),
}

impl FsFileError {
    pub fn msg(&self) -> &'static str {
        match self {
            FsFileError::IO(_) => "IO error",
            FsFileError::Allocator(_) => "Allocator error",
            FsFileError::Directory(_) => "Directory error",
            FsFileError::InvalidDescriptor => "Invalid file descriptor",
            FsFileError::TooManyOpenFiles => "Too many open files",
            FsFileError::AccessDenied => "Access mode does not permit this operation",
            FsFileError::Corrupted(msg) => msg,
            FsFileError::Other(msg) => msg,
        }
    }

    pub fn source(&self) -> Option<FsError> {
        match self {
            FsFileError::IO(e) => Some(FsError::IO(*e)),
            FsFileError::Allocator(e) => Some(FsError::Allocator(*e)),
            FsFileError::Directory(e) => Some(FsError::Directory(*e)),
            _ => None,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            FsFileError::IO(_) => ErrorKind::Io,
            FsFileError::Allocator(e) => e.kind(),
            FsFileError::Directory(e) => e.kind(),
            FsFileError::InvalidDescriptor => ErrorKind::InvalidDescriptor,
            FsFileError::TooManyOpenFiles => ErrorKind::TooManyOpenFiles,
            FsFileError::AccessDenied => ErrorKind::AccessDenied,
            FsFileError::Corrupted(_) => ErrorKind::Corrupted,
            FsFileError::Other(_) => ErrorKind::Other,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FsFormatterError {
    IO(BlockDevError),
    Allocator(FsAllocatorError),
    Directory(FsDirectoryError),
    Invalid(&'static str),
    Other(&'static str),
}

impl FsFormatterError {
    pub fn msg(&self) -> &'static str {
        match self {
            FsFormatterError::IO(_) => "IO error",
            FsFormatterError::Allocator(_) => "Allocator error",
            FsFormatterError::Directory(_) => "Directory error",
            FsFormatterError::Invalid(msg) => msg,
            FsFormatterError::Other(msg) => msg,
        }
    }

    pub fn source(&self) -> Option<FsError> {
        match self {
            FsFormatterError::IO(e) => Some(FsError::IO(*e)),
            FsFormatterError::Allocator(e) => Some(FsError::Allocator(*e)),
            FsFormatterError::Directory(e) => Some(FsError::Directory(*e)),
            _ => None,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            FsFormatterError::IO(_) => ErrorKind::Io,
            FsFormatterError::Allocator(e) => e.kind(),
            FsFormatterError::Directory(e) => e.kind(),
            FsFormatterError::Invalid(_) => ErrorKind::Invalid,
            FsFormatterError::Other(_) => ErrorKind::Other,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FsMountError {
    IO(BlockDevError),
    Formatter(FsFormatterError),
    NotFormatted,
    BadChecksum,
    Invalid(&'static str),
    Other(&'static str),
}

impl FsMountError {
    pub fn msg(&self) -> &'static str {
        match self {
            FsMountError::IO(_) => "IO error",
            FsMountError::Formatter(_) => "Formatter error",
            FsMountError::NotFormatted => "Volume signature not found",
            FsMountError::BadChecksum => "Volume descriptor checksum mismatch",
            FsMountError::Invalid(msg) => msg,
            FsMountError::Other(msg) => msg,
        }
    }

    pub fn source(&self) -> Option<FsError> {
        match self {
            FsMountError::IO(e) => Some(FsError::IO(*e)),
            FsMountError::Formatter(e) => Some(FsError::Formatter(*e)),
            _ => None,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            FsMountError::IO(_) => ErrorKind::Io,
            FsMountError::Formatter(e) => e.kind(),
            FsMountError::NotFormatted => ErrorKind::NotFormatted,
            FsMountError::BadChecksum => ErrorKind::BadChecksum,
            FsMountError::Invalid(_) => ErrorKind::Invalid,
            FsMountError::Other(_) => ErrorKind::Other,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FsCheckerError {
    IO(BlockDevError),
    Allocator(FsAllocatorError),
    Directory(FsDirectoryError),
    Invalid(&'static str),
    Other(&'static str),
}

impl FsCheckerError {
    pub fn msg(&self) -> &'static str {
        match self {
            FsCheckerError::IO(_) => "IO error",
            FsCheckerError::Allocator(_) => "Allocator error",
            FsCheckerError::Directory(_) => "Directory error",
            FsCheckerError::Invalid(msg) => msg,
            FsCheckerError::Other(msg) => msg,
        }
    }

    pub fn source(&self) -> Option<FsError> {
        match self {
            FsCheckerError::IO(e) => Some(FsError::IO(*e)),
            FsCheckerError::Allocator(e) => Some(FsError::Allocator(*e)),
            FsCheckerError::Directory(e) => Some(FsError::Directory(*e)),
            _ => None,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            FsCheckerError::IO(_) => ErrorKind::Io,
            FsCheckerError::Allocator(e) => e.kind(),
            FsCheckerError::Directory(e) => e.kind(),
            FsCheckerError::Invalid(_) => ErrorKind::Invalid,
            FsCheckerError::Other(_) => ErrorKind::Other,
        }
    }
}

crate::fs_error_display!(
    FsDirectoryError,
    FsFileError,
    FsFormatterError,
    FsMountError,
    FsCheckerError,
);

/// Top-level error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FsError {
    IO(BlockDevError),
    Allocator(FsAllocatorError),
    Directory(FsDirectoryError),
    File(FsFileError),
    Formatter(FsFormatterError),
    Mount(FsMountError),
    Checker(FsCheckerError),
    Other(&'static str),
}

impl fmt::Display for FsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            // Keeps the block number of corrupt chains in the message
            FsError::Allocator(e) => write!(f, "{e}"),
            _ => {
                write!(f, "{}", self.msg())?;
                let mut current = self.source();
                while let Some(src) = current {
                    write!(f, "\n  caused by: {}", src.msg())?;
                    current = src.source();
                }
                Ok(())
            }
        }
    }
}

impl FsError {
    pub fn msg(&self) -> &'static str {
        match self {
            FsError::IO(e) => e.msg(),
            FsError::Allocator(e) => e.msg(),
            FsError::Directory(e) => e.msg(),
            FsError::File(e) => e.msg(),
            FsError::Formatter(e) => e.msg(),
            FsError::Mount(e) => e.msg(),
            FsError::Checker(e) => e.msg(),
            FsError::Other(msg) => msg,
        }
    }

    pub fn source(&self) -> Option<FsError> {
        match self {
            FsError::Allocator(e) => e.source(),
            FsError::Directory(e) => e.source(),
            FsError::File(e) => e.source(),
            FsError::Formatter(e) => e.source(),
            FsError::Mount(e) => e.source(),
            FsError::Checker(e) => e.source(),
            FsError::IO(_) => None,
            FsError::Other(_) => None,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            FsError::IO(_) => ErrorKind::Io,
            FsError::Allocator(e) => e.kind(),
            FsError::Directory(e) => e.kind(),
            FsError::File(e) => e.kind(),
            FsError::Formatter(e) => e.kind(),
            FsError::Mount(e) => e.kind(),
            FsError::Checker(e) => e.kind(),
            FsError::Other(_) => ErrorKind::Other,
        }
    }
}

// === type Fs*Result ===

pub type FsResult<T = ()> = Result<T, FsError>;
pub type FsAllocatorResult<T = ()> = Result<T, FsAllocatorError>;
pub type FsDirectoryResult<T = ()> = Result<T, FsDirectoryError>;
pub type FsFileResult<T = ()> = Result<T, FsFileError>;
pub type FsFormatterResult<T = ()> = Result<T, FsFormatterError>;
pub type FsMountResult<T = ()> = Result<T, FsMountError>;
pub type FsCheckerResult<T = ()> = Result<T, FsCheckerError>;

crate::fs_error_wiring! {
    top => FsError {
        BlockDevError    : IO,
        FsAllocatorError : Allocator,
        FsDirectoryError : Directory,
        FsFileError      : File,
        FsFormatterError : Formatter,
        FsMountError     : Mount,
        FsCheckerError   : Checker,
    },
    str_into => [
        FsAllocatorError,
        FsDirectoryError,
        FsFileError,
        FsFormatterError,
        FsMountError,
        FsCheckerError,
    ],
    sub => {
        BlockDevError    => [ FsAllocatorError::IO, FsDirectoryError::IO, FsFileError::IO, FsFormatterError::IO, FsMountError::IO, FsCheckerError::IO ],
        FsAllocatorError => [ FsDirectoryError::Allocator, FsFileError::Allocator, FsFormatterError::Allocator, FsCheckerError::Allocator ],
        FsDirectoryError => [ FsFileError::Directory, FsFormatterError::Directory, FsCheckerError::Directory ],
        FsFormatterError => [ FsMountError::Formatter ],
    },
}

#[cfg(all(test, feature = "std"))]
mod tests {
    use super::*;

    #[test]
    fn test_error_chain_display() {
        let low = BlockDevError::OutOfBounds;
        let dir = FsDirectoryError::from(FsAllocatorError::from(low));
        let top = FsError::File(FsFileError::from(dir));

        let text = top.to_string();
        assert!(text.starts_with("Directory error"));
        assert!(text.contains("caused by: Allocator error"));
        assert!(text.contains("caused by: Out of bounds"));
    }

    #[test]
    fn test_kind_looks_through_nesting() {
        let err = FsFileError::Directory(FsDirectoryError::Allocator(FsAllocatorError::OutOfSpace));
        assert_eq!(err.kind(), ErrorKind::OutOfSpace);
        assert_eq!(FsError::from(err).kind(), ErrorKind::OutOfSpace);

        let err: FsDirectoryError = "bad".into();
        assert_eq!(err, FsDirectoryError::Other("bad"));
        assert_eq!(err.kind(), ErrorKind::Other);
    }

    #[test]
    fn test_corrupt_chain_display_keeps_block() {
        let top = FsError::from(FsAllocatorError::CorruptChain(42));
        assert_eq!(top.to_string(), "Corrupt block chain (block: 42)");
    }
}
