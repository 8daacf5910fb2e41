/// Report adapters rendering scan results for download
mod pdf_writer;

pub use pdf_writer::PdfReportWriter;
