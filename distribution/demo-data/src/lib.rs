//! Shared sample lecture documents for tests and local experiments.
//!
//! Each document mirrors what the OCR/PDF extractor hands to the indexer:
//! raw words with their four corner points (top-left, top-right,
//! bottom-right, bottom-left) grouped per page.

pub struct DemoToken {
    pub word: &'static str,
    pub corners: [(f64, f64); 4],
}

pub struct DemoDocument {
    pub filename: &'static str,
    pub path: &'static str,
    pub tags: &'static [(&'static str, &'static str)],
    pub text: &'static str,
    pub pages: &'static [&'static [DemoToken]],
}

const fn tok(word: &'static str, x0: f64, y0: f64, x1: f64, y1: f64) -> DemoToken {
    DemoToken {
        word,
        corners: [(x0, y0), (x1, y0), (x1, y1), (x0, y1)],
    }
}

pub const PSYCHOLOGY_LECTURE: DemoDocument = DemoDocument {
    filename: "Психология_общения-1-20230927-3-1-Ермакова_Анна_Викторовна@Античность.pdf",
    path: "/srv/lectures/Психология_общения-1-20230927-3-1-Ермакова_Анна_Викторовна.pdf",
    tags: &[
        ("subject", "Психология общения"),
        ("number", "1"),
        ("date", "27.09.2023"),
        ("course", "3"),
        ("semester", "1"),
        ("teacher", "Ермакова Анна Викторовна"),
        ("doginfo", ""),
        ("filetype", "pdf"),
    ],
    text: "ehehehe d привет я i тим, я i люблю биологию очень сильно, биология - это жизнь. \
           А ещё Кевин любит биологию. И биологию в интелектуальных системах",
    pages: &[
        &[
            tok("ehehehe", 1510.0, 1017.0, 1512.0, 1028.0),
            tok("d", 1461.0, 1031.0, 1512.0, 1044.0),
            tok("привет", 1461.0, 1045.0, 1512.0, 1058.0),
            tok("я", 1461.0, 1061.0, 1462.0, 1073.0),
            tok("i", 1510.0, 1060.0, 1512.0, 1071.0),
            tok("тим", 922.0, 1105.0, 1454.0, 1155.0),
            tok("я", 1457.0, 1104.0, 1674.0, 1143.0),
            tok("i", 1129.0, 1143.0, 1189.0, 1156.0),
            tok("люблю", 1510.0, 1145.0, 1512.0, 1172.0),
        ],
        &[
            tok("биологию", 1582.0, 1149.0, 1607.0, 1164.0),
            tok("очень", 1614.0, 1143.0, 1653.0, 1160.0),
            tok("сильно", 1666.0, 1143.0, 1729.0, 1160.0),
            tok("биология", 1137.0, 1170.0, 1160.0, 1183.0),
            tok("это", 1173.0, 1170.0, 1192.0, 1183.0),
            tok("жизнь", 1503.0, 1174.0, 1518.0, 1214.0),
        ],
        &[
            tok("а", 1582.0, 1166.0, 1583.0, 1192.0),
            tok("ещё", 1613.0, 1181.0, 1639.0, 1190.0),
            tok("Кевин", 1651.0, 1177.0, 1737.0, 1194.0),
            tok("любит", 1582.0, 1195.0, 1583.0, 1207.0),
            tok("биологию", 1691.0, 1201.0, 1693.0, 1203.0),
            tok("и", 1169.0, 1208.0, 1186.0, 1217.0),
            tok("биологию", 1198.0, 1204.0, 1238.0, 1217.0),
            tok("в", 1262.0, 1204.0, 1270.0, 1217.0),
            tok("интелектуальных", 1614.0, 1198.0, 1785.0, 1214.0),
            tok("системах", 1700.0, 1194.0, 1730.0, 1220.0),
        ],
    ],
};

pub const BIOLOGY_LECTURE: DemoDocument = DemoDocument {
    filename: "Биология-4-20240312-2-2-Смирнов_Олег@Клетка.pdf",
    path: "/srv/lectures/Биология-4-20240312-2-2-Смирнов_Олег@Клетка.pdf",
    tags: &[
        ("subject", "Биология"),
        ("number", "4"),
        ("date", "12.03.2024"),
        ("course", "2"),
        ("semester", "2"),
        ("teacher", "Смирнов Олег"),
        ("doginfo", "Клетка"),
        ("filetype", "pdf"),
    ],
    text: "Строение клетки. Клетка — основная единица жизни. Биологию клетки изучает цитология.",
    pages: &[
        &[
            tok("Строение", 100.0, 80.0, 220.0, 110.0),
            tok("клетки.", 230.0, 80.0, 330.0, 110.0),
        ],
        &[
            tok("Клетка", 100.0, 80.0, 190.0, 110.0),
            tok("—", 195.0, 80.0, 205.0, 110.0),
            tok("основная", 210.0, 80.0, 330.0, 110.0),
            tok("единица", 340.0, 80.0, 450.0, 110.0),
            tok("жизни.", 460.0, 80.0, 540.0, 110.0),
            tok("Биологию", 100.0, 130.0, 230.0, 160.0),
            tok("клетки", 240.0, 130.0, 330.0, 160.0),
            tok("изучает", 340.0, 130.0, 440.0, 160.0),
            tok("цитология.", 450.0, 130.0, 590.0, 160.0),
        ],
    ],
};

pub const ALL_DOCUMENTS: &[&DemoDocument] = &[&PSYCHOLOGY_LECTURE, &BIOLOGY_LECTURE];
