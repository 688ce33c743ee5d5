//! In-memory PDF fixtures shared by the integration tests.

#![allow(dead_code)]

use std::io::Cursor;
use std::io::Write as _;

use flate2::write::ZlibEncoder;
use flate2::Compression;
use pdf_fill::Pdf;

/// Builds a classic-xref PDF from numbered object bodies. Object numbers
/// are assigned sequentially from 1; the catalog is expected at object 1.
pub struct Builder {
    objects: Vec<Vec<u8>>,
    trailer_extra: String,
}

impl Builder {
    pub fn new() -> Self {
        Self {
            objects: Vec::new(),
            trailer_extra: String::new(),
        }
    }

    /// Append an object body; returns the object number it received.
    pub fn object(&mut self, body: &str) -> u32 {
        self.object_bytes(body.as_bytes().to_vec())
    }

    pub fn object_bytes(&mut self, body: Vec<u8>) -> u32 {
        self.objects.push(body);
        self.objects.len() as u32
    }

    /// Extra entries spliced into the trailer dictionary.
    pub fn trailer_extra(&mut self, extra: &str) {
        self.trailer_extra = extra.to_string();
    }

    pub fn build(&self) -> Vec<u8> {
        let mut out = b"%PDF-1.7\n".to_vec();
        let mut offsets = Vec::new();
        for (i, body) in self.objects.iter().enumerate() {
            offsets.push(out.len());
            out.extend_from_slice(format!("{} 0 obj\n", i + 1).as_bytes());
            out.extend_from_slice(body);
            out.extend_from_slice(b"\nendobj\n");
        }
        let xref_off = out.len();
        out.extend_from_slice(format!("xref\n0 {}\n", self.objects.len() + 1).as_bytes());
        out.extend_from_slice(b"0000000000 65535 f \n");
        for off in &offsets {
            out.extend_from_slice(format!("{:010} 00000 n \n", off).as_bytes());
        }
        out.extend_from_slice(
            format!(
                "trailer\n<< /Size {} /Root 1 0 R {}>>\nstartxref\n{}\n%%EOF\n",
                self.objects.len() + 1,
                self.trailer_extra,
                xref_off
            )
            .as_bytes(),
        );
        out
    }
}

/// Open fixture bytes as a store over an in-memory cursor.
pub fn open(bytes: Vec<u8>) -> Pdf<Cursor<Vec<u8>>> {
    Pdf::open(Cursor::new(bytes)).expect("fixture should open")
}

/// Reopen the bytes a previous store wrote into its cursor.
pub fn reopen(pdf: Pdf<Cursor<Vec<u8>>>) -> Pdf<Cursor<Vec<u8>>> {
    open(into_bytes(pdf))
}

pub fn into_bytes(pdf: Pdf<Cursor<Vec<u8>>>) -> Vec<u8> {
    pdf.into_file().into_inner()
}

fn zlib(data: &[u8]) -> Vec<u8> {
    let mut enc = ZlibEncoder::new(Vec::new(), Compression::default());
    enc.write_all(data).unwrap();
    enc.finish().unwrap()
}

/// A one-page document with a single empty text field named `Name`.
pub fn text_field_pdf() -> Vec<u8> {
    let mut b = Builder::new();
    b.object("<< /Type /Catalog /Pages 2 0 R /AcroForm 3 0 R >>");
    b.object("<< /Type /Pages /Kids [ 4 0 R ] /Count 1 >>");
    b.object("<< /Fields [ 5 0 R ] /DR << /Font << /Helv 6 0 R >> >> >>");
    b.object("<< /Type /Page /Parent 2 0 R /MediaBox [ 0 0 612 792 ] /Annots [ 5 0 R ] >>");
    b.object(
        "<< /T (Name) /FT /Tx /DA (/Helv 12 Tf 0 g) /Rect [ 100 700 300 720 ] \
         /P 4 0 R /Type /Annot /Subtype /Widget >>",
    );
    b.object("<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica >>");
    b.build()
}

/// Like [`text_field_pdf`] but with a tall widget (multiline) and a DA
/// whose font size is zero (auto).
pub fn tall_text_field_pdf() -> Vec<u8> {
    let mut b = Builder::new();
    b.object("<< /Type /Catalog /Pages 2 0 R /AcroForm 3 0 R >>");
    b.object("<< /Type /Pages /Kids [ 4 0 R ] /Count 1 >>");
    b.object("<< /Fields [ 5 0 R ] /DR << /Font << /Helv 6 0 R >> >> >>");
    b.object("<< /Type /Page /Parent 2 0 R /MediaBox [ 0 0 612 792 ] /Annots [ 5 0 R ] >>");
    b.object(
        "<< /T (Notes) /FT /Tx /DA (/Helv 0 Tf 0 g) /Rect [ 100 600 300 700 ] \
         /P 4 0 R /Type /Annot /Subtype /Widget >>",
    );
    b.object("<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica >>");
    b.build()
}

/// A document with a single checkbox named `Agree`, initially off.
pub fn checkbox_pdf() -> Vec<u8> {
    let mut b = Builder::new();
    b.object("<< /Type /Catalog /Pages 2 0 R /AcroForm 3 0 R >>");
    b.object("<< /Type /Pages /Kids [ 4 0 R ] /Count 1 >>");
    b.object("<< /Fields [ 5 0 R ] >>");
    b.object("<< /Type /Page /Parent 2 0 R /Annots [ 5 0 R ] >>");
    b.object(
        "<< /T (Agree) /FT /Btn /AS /Off /Rect [ 0 0 10 10 ] /P 4 0 R \
         /Type /Annot /Subtype /Widget >>",
    );
    b.build()
}

/// A radio set named `Choice` with three buttons whose appearance states
/// are `1`, `2`, and `3`.
pub fn radio_pdf() -> Vec<u8> {
    let mut b = Builder::new();
    b.object("<< /Type /Catalog /Pages 2 0 R /AcroForm 3 0 R >>");
    b.object("<< /Type /Pages /Kids [ 4 0 R ] /Count 1 >>");
    b.object("<< /Fields [ 5 0 R ] >>");
    b.object("<< /Type /Page /Parent 2 0 R /Annots [ 6 0 R 7 0 R 8 0 R ] >>");
    b.object("<< /T (Choice) /FT /Btn /Ff 32768 /V /Off /Kids [ 6 0 R 7 0 R 8 0 R ] >>");
    for state in ["1", "2", "3"] {
        b.object(&format!(
            "<< /Type /Annot /Subtype /Widget /P 4 0 R /Parent 5 0 R /Rect [ 0 0 10 10 ] \
             /AS /Off /AP << /N << /{} 9 0 R >> >> >>",
            state
        ));
    }
    b.object_bytes(
        b"<< /Type /XObject /Subtype /Form /BBox [ 0 0 10 10 ] /Length 0 >>\nstream\n\nendstream"
            .to_vec(),
    );
    b.build()
}

/// A choice field named `Position` with options Alpha, Beta, and a
/// (export, display) pair whose displayed text is Gamma.
pub fn choice_pdf(editable: bool) -> Vec<u8> {
    let flags = if editable { 0x60000 } else { 0 };
    let mut b = Builder::new();
    b.object("<< /Type /Catalog /Pages 2 0 R /AcroForm 3 0 R >>");
    b.object("<< /Type /Pages /Kids [ 4 0 R ] /Count 1 >>");
    b.object("<< /Fields [ 5 0 R ] >>");
    b.object("<< /Type /Page /Parent 2 0 R /Annots [ 5 0 R ] >>");
    b.object(&format!(
        "<< /T (Position) /FT /Ch /Ff {} /Opt [ (Alpha) (Beta) [ (g) (Gamma) ] ] \
         /Rect [ 0 0 100 20 ] /P 4 0 R /Type /Annot /Subtype /Widget >>",
        flags
    ));
    b.build()
}

/// A hierarchical form: `form1.sub` is a text field below a parent node.
pub fn nested_field_pdf() -> Vec<u8> {
    let mut b = Builder::new();
    b.object("<< /Type /Catalog /Pages 2 0 R /AcroForm 3 0 R >>");
    b.object("<< /Type /Pages /Kids [ 4 0 R ] /Count 1 >>");
    b.object("<< /Fields [ 5 0 R ] /DR << /Font << /Helv 7 0 R >> >> >>");
    b.object("<< /Type /Page /Parent 2 0 R /Annots [ 6 0 R ] >>");
    b.object("<< /T (form1) /Kids [ 6 0 R ] >>");
    b.object(
        "<< /T (sub) /Parent 5 0 R /FT /Tx /DA (/Helv 10 Tf 0 g) /Rect [ 0 0 150 18 ] \
         /P 4 0 R /Type /Annot /Subtype /Widget >>",
    );
    b.object("<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica >>");
    b.build()
}

/// A push button (no value to set).
pub fn push_button_pdf() -> Vec<u8> {
    let mut b = Builder::new();
    b.object("<< /Type /Catalog /Pages 2 0 R /AcroForm 3 0 R >>");
    b.object("<< /Type /Pages /Kids [ 4 0 R ] /Count 1 >>");
    b.object("<< /Fields [ 5 0 R ] >>");
    b.object("<< /Type /Page /Parent 2 0 R /Annots [ 5 0 R ] >>");
    b.object("<< /T (Go) /FT /Btn /Ff 65536 /Rect [ 0 0 50 20 ] /P 4 0 R >>");
    b.build()
}

/// A one-page document with three empty text fields `A`, `B`, `C`, for
/// page cloning.
pub fn three_field_page_pdf() -> Vec<u8> {
    let mut b = Builder::new();
    b.object("<< /Type /Catalog /Pages 2 0 R /AcroForm 3 0 R >>");
    b.object("<< /Type /Pages /Kids [ 4 0 R ] /Count 1 >>");
    b.object("<< /Fields [ 5 0 R 6 0 R 7 0 R ] /DR << /Font << /Helv 8 0 R >> >> >>");
    b.object(
        "<< /Type /Page /Parent 2 0 R /MediaBox [ 0 0 612 792 ] \
         /Annots [ 5 0 R 6 0 R 7 0 R ] >>",
    );
    for (name, y) in [("A", 700), ("B", 660), ("C", 620)] {
        b.object(&format!(
            "<< /T ({}) /FT /Tx /DA (/Helv 12 Tf 0 g) /Rect [ 100 {} 300 {} ] \
             /P 4 0 R /Type /Annot /Subtype /Widget >>",
            name,
            y,
            y + 20
        ));
    }
    b.object("<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica >>");
    b.build()
}

/// A PDF whose only cross-reference section is an xref stream with
/// `/W [1 2 1]` and `/Index [2 5]` (objects 2 through 6).
pub fn xref_stream_pdf() -> Vec<u8> {
    let mut out = b"%PDF-1.7\n".to_vec();
    let off2 = out.len();
    out.extend_from_slice(b"2 0 obj\n<< /Type /Catalog /Pages 3 0 R >>\nendobj\n");
    let off3 = out.len();
    out.extend_from_slice(b"3 0 obj\n<< /Type /Pages /Kids [ 4 0 R ] /Count 1 >>\nendobj\n");
    let off4 = out.len();
    out.extend_from_slice(b"4 0 obj\n<< /Type /Page /Parent 3 0 R >>\nendobj\n");
    let off5 = out.len();
    out.extend_from_slice(b"5 0 obj\n(hello)\nendobj\n");
    let off6 = out.len();
    let mut rows = Vec::new();
    for off in [off2, off3, off4, off5, off6] {
        rows.push(1u8);
        rows.extend_from_slice(&(off as u16).to_be_bytes());
        rows.push(0u8);
    }
    out.extend_from_slice(
        format!(
            "6 0 obj\n<< /Type /XRef /W [ 1 2 1 ] /Index [ 2 5 ] /Size 7 /Root 2 0 R \
             /Length {} >>\nstream\n",
            rows.len()
        )
        .as_bytes(),
    );
    out.extend_from_slice(&rows);
    out.extend_from_slice(b"\nendstream\nendobj\n");
    out.extend_from_slice(format!("startxref\n{}\n%%EOF\n", off6).as_bytes());
    out
}

/// A PDF where objects 10-13 live inside compressed object stream 9;
/// object 12 sits at index 3.
pub fn object_stream_pdf(compressed: bool) -> Vec<u8> {
    let mut out = b"%PDF-1.7\n".to_vec();
    let off1 = out.len();
    out.extend_from_slice(b"1 0 obj\n<< /Type /Catalog /Pages 2 0 R >>\nendobj\n");
    let off2 = out.len();
    out.extend_from_slice(b"2 0 obj\n<< /Type /Pages /Kids [ ] /Count 0 >>\nendobj\n");

    let entries: &[(u32, &str)] = &[
        (10, "123"),
        (11, "(abc)"),
        (13, "<< /A 1 >>"),
        (12, "<< /Answer 42 >>"),
    ];
    let mut header = String::new();
    let mut body = String::new();
    for (num, text) in entries {
        header.push_str(&format!("{} {} ", num, body.len()));
        body.push_str(text);
        body.push(' ');
    }
    let first = header.len();
    let mut payload = format!("{}{}", header, body).into_bytes();
    let mut filter = "";
    if compressed {
        payload = zlib(&payload);
        filter = " /Filter /FlateDecode";
    }
    let off9 = out.len();
    out.extend_from_slice(
        format!(
            "9 0 obj\n<< /Type /ObjStm /N {} /First {}{} /Length {} >>\nstream\n",
            entries.len(),
            first,
            filter,
            payload.len()
        )
        .as_bytes(),
    );
    out.extend_from_slice(&payload);
    out.extend_from_slice(b"\nendstream\nendobj\n");

    let off14 = out.len();
    let mut rows = Vec::new();
    let mut push = |t: u8, mid: u16, low: u8| {
        rows.push(t);
        rows.extend_from_slice(&mid.to_be_bytes());
        rows.push(low);
    };
    push(1, off1 as u16, 0);
    push(1, off2 as u16, 0);
    push(1, off9 as u16, 0);
    push(2, 9, 0); // object 10
    push(2, 9, 1); // object 11
    push(2, 9, 3); // object 12 at index 3
    push(2, 9, 2); // object 13 at index 2
    push(1, off14 as u16, 0);
    out.extend_from_slice(
        format!(
            "14 0 obj\n<< /Type /XRef /W [ 1 2 1 ] /Index [ 1 2 9 6 ] /Size 15 /Root 1 0 R \
             /Length {} >>\nstream\n",
            rows.len()
        )
        .as_bytes(),
    );
    out.extend_from_slice(&rows);
    out.extend_from_slice(b"\nendstream\nendobj\n");
    out.extend_from_slice(format!("startxref\n{}\n%%EOF\n", off14).as_bytes());
    out
}

/// A base revision defining object 2 as `(A)` and an incremental revision
/// redefining it as `(B)`.
pub fn two_revision_pdf() -> Vec<u8> {
    let mut out = b"%PDF-1.7\n".to_vec();
    let off1 = out.len();
    out.extend_from_slice(b"1 0 obj\n<< /Type /Catalog /Pages 3 0 R >>\nendobj\n");
    let off2 = out.len();
    out.extend_from_slice(b"2 0 obj\n(A)\nendobj\n");
    let off3 = out.len();
    out.extend_from_slice(b"3 0 obj\n<< /Type /Pages /Kids [ ] /Count 0 >>\nendobj\n");
    let x1 = out.len();
    out.extend_from_slice(
        format!(
            "xref\n0 4\n0000000000 65535 f \n{:010} 00000 n \n{:010} 00000 n \n{:010} 00000 n \n\
             trailer\n<< /Size 4 /Root 1 0 R >>\n",
            off1, off2, off3
        )
        .as_bytes(),
    );
    let off2b = out.len();
    out.extend_from_slice(b"2 0 obj\n(B)\nendobj\n");
    let x2 = out.len();
    out.extend_from_slice(
        format!(
            "xref\n2 1\n{:010} 00000 n \ntrailer\n<< /Size 4 /Prev {} >>\nstartxref\n{}\n%%EOF\n",
            off2b, x1, x2
        )
        .as_bytes(),
    );
    out
}
