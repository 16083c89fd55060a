diesel::table! {
    packages (pkey) {
        pkey -> Integer,
        id -> Text,
        lower_id -> Text,
        version -> Text,
        listed -> Bool,
        downloads -> BigInt,
        published -> Text,
    }
}
