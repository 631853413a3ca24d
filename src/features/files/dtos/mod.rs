mod file_dto;

pub use file_dto::{
    CreateLinkDto, DownloadedFile, FileDetailsDto, GrantDto, GrantResultDto, IncomingFile,
    OwnedFileDto, ShareFileDto, ShareLinkDto, SharedFileDto, UploadFilesDto, UploadedFileDto,
};
