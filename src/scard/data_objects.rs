//! OpenPGP card data objects
//!
//! Catalog of the GET DATA objects the tool reads, with their parent
//! relationships inside the constructed templates.

/// A data object published by the OpenPGP applet
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DataObject {
    /// BER tag (one or two bytes, as a u16)
    pub tag: u16,
    /// Constructed (template) record
    pub constructed: bool,
    /// Enclosing template tag, 0 for top-level objects
    pub parent: u16,
    /// Human-readable description
    pub desc: &'static str,
}

impl DataObject {
    /// P1 of a GET DATA command for this object
    pub fn tag_p1(&self) -> u8 {
        (self.tag >> 8) as u8
    }

    /// P2 of a GET DATA command for this object
    pub fn tag_p2(&self) -> u8 {
        self.tag as u8
    }

    /// Child objects of this template
    pub fn children(&self) -> impl Iterator<Item = &'static DataObject> {
        let parent = self.tag;
        DATA_OBJECTS.iter().filter(move |d| d.parent == parent)
    }
}

pub const CARDHOLDER_RELATED_DATA: DataObject = DataObject {
    tag: 0x0065,
    constructed: true,
    parent: 0,
    desc: "Cardholder Related Data",
};
pub const NAME: DataObject = DataObject {
    tag: 0x005B,
    constructed: false,
    parent: 0x65,
    desc: "Name",
};
pub const LANGUAGE_PREFS: DataObject = DataObject {
    tag: 0x5F2D,
    constructed: false,
    parent: 0x65,
    desc: "Language preferences",
};
pub const SALUTATION: DataObject = DataObject {
    tag: 0x5F35,
    constructed: false,
    parent: 0x65,
    desc: "Salutation",
};
pub const APPLICATION_RELATED_DATA: DataObject = DataObject {
    tag: 0x006E,
    constructed: true,
    parent: 0,
    desc: "Application Related Data",
};
pub const AID: DataObject = DataObject {
    tag: 0x004F,
    constructed: false,
    parent: 0x6E,
    desc: "Application Identifier (AID)",
};
pub const ALGO_ATTR_SIGN: DataObject = DataObject {
    tag: 0x00C1,
    constructed: false,
    parent: 0x6E,
    desc: "Algorithm Attributes Signature",
};
pub const ALGO_ATTR_ENC: DataObject = DataObject {
    tag: 0x00C2,
    constructed: false,
    parent: 0x6E,
    desc: "Algorithm Attributes Encryption",
};
pub const ALGO_ATTR_AUTH: DataObject = DataObject {
    tag: 0x00C3,
    constructed: false,
    parent: 0x6E,
    desc: "Algorithm Attributes Authentication",
};
pub const PW_STATUS: DataObject = DataObject {
    tag: 0x00C4,
    constructed: false,
    parent: 0x6E,
    desc: "Password Status Bytes",
};
pub const FINGERPRINTS: DataObject = DataObject {
    tag: 0x00C5,
    constructed: false,
    parent: 0x6E,
    desc: "Fingerprints",
};
pub const KEY_GEN_DATES: DataObject = DataObject {
    tag: 0x00CD,
    constructed: false,
    parent: 0x6E,
    desc: "Generation times of key pairs",
};

/// All cataloged data objects
pub const DATA_OBJECTS: &[DataObject] = &[
    CARDHOLDER_RELATED_DATA,
    NAME,
    LANGUAGE_PREFS,
    SALUTATION,
    APPLICATION_RELATED_DATA,
    AID,
    ALGO_ATTR_SIGN,
    ALGO_ATTR_ENC,
    ALGO_ATTR_AUTH,
    PW_STATUS,
    FINGERPRINTS,
    KEY_GEN_DATES,
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn get_data_parameters() {
        assert_eq!(APPLICATION_RELATED_DATA.tag_p1(), 0x00);
        assert_eq!(APPLICATION_RELATED_DATA.tag_p2(), 0x6E);
        assert_eq!(LANGUAGE_PREFS.tag_p1(), 0x5F);
        assert_eq!(LANGUAGE_PREFS.tag_p2(), 0x2D);
    }

    #[test]
    fn template_children() {
        let children: Vec<u16> = APPLICATION_RELATED_DATA.children().map(|d| d.tag).collect();
        assert_eq!(children, vec![0x4F, 0xC1, 0xC2, 0xC3, 0xC4, 0xC5, 0xCD]);

        let children: Vec<u16> = CARDHOLDER_RELATED_DATA.children().map(|d| d.tag).collect();
        assert_eq!(children, vec![0x5B, 0x5F2D, 0x5F35]);
    }
}
