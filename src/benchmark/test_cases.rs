/// Headlines sent by the benchmark, in run order: two intended fake, two intended real.
pub const TEST_CASES: [(&str, &str); 4] = [
    (
        "fake_news_1",
        "BREAKING: Aliens have officially made contact with Earth government officials in secret meeting",
    ),
    (
        "fake_news_2",
        "Scientists discover that drinking coffee grants immortality, governments suppress information",
    ),
    ("real_news_1", "The president made an official statement today."),
    ("real_news_2", "The professor made an official statement today."),
];
