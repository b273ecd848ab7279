//! Built-in lessons used when generation fails, three per skill.
//!
//! Lessons come back with empty ids and titles; `generator::assemble_section`
//! assigns them the same way it does for generated lessons.

use chrono::{DateTime, Utc};

use crate::domain::{AnswerValue, Level, LessonContent, LessonData, Question, QuestionType, Skill, WordEntry};
use crate::prompts::min_words;

fn mcq(question: &str, options: [&str; 4], answer: usize) -> Question {
    Question {
        id: String::new(),
        question: question.to_string(),
        kind: QuestionType::Mcq,
        options: Some(options.iter().map(|o| o.to_string()).collect()),
        correct_answer: Some(AnswerValue::from(answer)),
        points: 10,
    }
}

fn true_false(question: &str, answer: bool) -> Question {
    Question {
        id: String::new(),
        question: question.to_string(),
        kind: QuestionType::TrueFalse,
        options: None,
        correct_answer: Some(AnswerValue::Bool(answer)),
        points: 10,
    }
}

fn fill_blank(question: &str, answer: &str) -> Question {
    Question {
        id: String::new(),
        question: question.to_string(),
        kind: QuestionType::FillBlank,
        options: None,
        correct_answer: Some(AnswerValue::from(answer)),
        points: 10,
    }
}

fn open(question: &str, exemplar: &str) -> Question {
    Question {
        id: String::new(),
        question: question.to_string(),
        kind: QuestionType::Open,
        options: None,
        correct_answer: Some(AnswerValue::from(exemplar)),
        points: 20,
    }
}

fn lesson(content: LessonContent, questions: Vec<Question>) -> LessonData {
    LessonData {
        id: String::new(),
        title: String::new(),
        content,
        questions,
    }
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

fn word(word: &str, definition: &str, example: &str, synonyms: &[&str]) -> WordEntry {
    WordEntry {
        word: word.to_string(),
        definition: definition.to_string(),
        example: example.to_string(),
        synonyms: strings(synonyms),
        pronunciation: None,
    }
}

/// The built-in lessons for `skill`. Writing targets follow `level`.
#[must_use]
pub fn fallback_lessons(skill: Skill, level: Level) -> Vec<LessonData> {
    match skill {
        Skill::Listening => listening(),
        Skill::Reading => reading(),
        Skill::Speaking => speaking(),
        Skill::Writing => writing(level),
        Skill::Grammar => grammar(),
        Skill::Vocabulary => vocabulary(),
    }
}

fn listening() -> Vec<LessonData> {
    vec![
        lesson(
            LessonContent::Listening {
                audio_text: "Hi, I'm Anna. I work at a small bakery near the train station. I start at six in the morning, so I usually take the first bus. After work I like to walk in the park with my dog.".into(),
            },
            vec![
                mcq("Where does Anna work?", ["At a train station", "At a bakery", "In a park", "On a bus"], 1),
                true_false("Anna starts work at six in the morning.", true),
                fill_blank("After work Anna walks in the park with her ____.", "dog"),
            ],
        ),
        lesson(
            LessonContent::Listening {
                audio_text: "Attention, passengers. The 10:15 train to Manchester will now leave from platform four instead of platform two. We apologise for the change. Passengers for Leeds should stay on platform two.".into(),
            },
            vec![
                mcq("Which platform does the Manchester train leave from now?", ["One", "Two", "Three", "Four"], 3),
                true_false("Passengers for Leeds must change platform.", false),
                fill_blank("The Manchester train leaves at ____.", "10:15"),
            ],
        ),
        lesson(
            LessonContent::Listening {
                audio_text: "Thanks for calling Green Street Dental. Our office is closed for the holiday until Monday. If you need to change an appointment, please leave your name and phone number after the tone, and we will call you back.".into(),
            },
            vec![
                mcq("Why is the office closed?", ["It is the weekend", "It is a holiday", "The dentist is ill", "It has moved"], 1),
                true_false("Callers should leave their name and phone number.", true),
                open("What should you do if you need to change an appointment?", "Leave my name and phone number after the tone and wait for a call back."),
            ],
        ),
    ]
}

fn reading() -> Vec<LessonData> {
    vec![
        lesson(
            LessonContent::Reading {
                text: "Tom lives in a small town by the sea. Every Saturday he goes to the market with his grandmother. They buy fresh fish, bread and fruit. Tom likes the market because he can talk to the fishermen about their boats.".into(),
            },
            vec![
                mcq("When does Tom go to the market?", ["Every day", "On Saturdays", "On Sundays", "Once a month"], 1),
                true_false("Tom goes to the market alone.", false),
                fill_blank("Tom likes talking to the ____ about their boats.", "fishermen"),
            ],
        ),
        lesson(
            LessonContent::Reading {
                text: "More people are working from home than ever before. Many say they save time and money because they do not travel to an office. However, some workers feel lonely and miss chatting with colleagues. Companies are now trying mixed schedules, with two or three office days each week.".into(),
            },
            vec![
                mcq("What problem do some home workers have?", ["They earn less", "They feel lonely", "They travel more", "They work longer"], 1),
                true_false("Some companies use mixed schedules.", true),
                open("Name one advantage of working from home mentioned in the text.", "People save time and money because they do not travel to an office."),
            ],
        ),
        lesson(
            LessonContent::Reading {
                text: "Urban gardens are appearing on rooftops and in empty lots across many cities. Supporters argue that they reduce heat, absorb rainwater and give residents access to fresh produce. Critics point out that soil in former industrial areas can be contaminated, so testing and raised beds are often necessary before anything is planted.".into(),
            },
            vec![
                mcq("Why might soil testing be necessary?", ["Rooftops are too hot", "Old industrial soil may be contaminated", "Plants need more rain", "Residents prefer raised beds"], 1),
                true_false("The text says urban gardens increase city temperatures.", false),
                open("Summarise the main argument of supporters in one sentence.", "Supporters say urban gardens cool cities, absorb rain and provide fresh food for residents."),
            ],
        ),
    ]
}

fn speaking() -> Vec<LessonData> {
    vec![
        lesson(
            LessonContent::Speaking {
                instructions: "Introduce yourself clearly. Speak in full sentences and keep a steady pace.".into(),
                prompts: strings(&["Say your name and where you are from.", "Describe your daily routine.", "Talk about a hobby you enjoy."]),
            },
            vec![open("Introduce yourself and describe your daily routine.", "My name is Maria and I am from Spain. I get up at seven, go to work by bus and cook dinner in the evening.")],
        ),
        lesson(
            LessonContent::Speaking {
                instructions: "Describe a past experience. Use past tense verbs and connect your ideas with words like first, then and finally.".into(),
                prompts: strings(&["Describe your last holiday.", "Talk about a memorable meal.", "Explain how you learned a new skill."]),
            },
            vec![open("Describe your last holiday.", "Last summer I went to the coast with my family. First we swam in the sea, then we visited an old castle, and finally we had dinner by the harbour.")],
        ),
        lesson(
            LessonContent::Speaking {
                instructions: "Give and support an opinion. State your view, give two reasons and mention one opposing point.".into(),
                prompts: strings(&["Should public transport be free?", "Is social media good for teenagers?", "Should schools start later in the morning?"]),
            },
            vec![open("Should public transport be free? Give your opinion with reasons.", "I believe public transport should be free because it reduces traffic and helps people with low incomes, although it would need to be funded by taxes.")],
        ),
    ]
}

fn writing(level: Level) -> Vec<LessonData> {
    let target = min_words(level);
    vec![
        lesson(
            LessonContent::Writing {
                prompt: "Write an email to a friend inviting them to your birthday party.".into(),
                instructions: strings(&["Say when and where the party is.", "Mention what you will do.", "Ask them to reply."]),
                min_words: target,
            },
            vec![open("Write your invitation email.", "Hi Sam, I'm having a birthday party next Saturday at 7pm at my flat. We'll have pizza and play games. Can you come? Let me know by Thursday. Best, Alex")],
        ),
        lesson(
            LessonContent::Writing {
                prompt: "Describe a place in your town that visitors should see.".into(),
                instructions: strings(&["Introduce the place.", "Describe what visitors can do there.", "Explain why you recommend it."]),
                min_words: target,
            },
            vec![open("Write your description.", "The old market square is the heart of my town. Visitors can try local food, watch street musicians and see the clock tower. I recommend it because it shows the real character of the town.")],
        ),
        lesson(
            LessonContent::Writing {
                prompt: "Some people think homework should be banned. Write an essay giving your opinion.".into(),
                instructions: strings(&["Write an introduction with your opinion.", "Give two supporting paragraphs.", "Address one opposing argument.", "Finish with a conclusion."]),
                min_words: target,
            },
            vec![open("Write your opinion essay.", "Homework should be limited rather than banned. It helps students practise what they learn, yet too much of it leaves no time for rest. A small, focused amount is the best balance.")],
        ),
    ]
}

fn grammar() -> Vec<LessonData> {
    vec![
        lesson(
            LessonContent::Grammar {
                explanation: "Use the present simple for habits and facts. Add -s or -es to the verb with he, she and it.".into(),
                examples: strings(&["She works in a hospital.", "Water boils at 100 degrees.", "They play football on Sundays."]),
            },
            vec![
                mcq("He ____ to school every day.", ["go", "goes", "going", "gone"], 1),
                fill_blank("My parents ____ (live) in London.", "live"),
                true_false("\"She watch TV every evening\" is correct.", false),
            ],
        ),
        lesson(
            LessonContent::Grammar {
                explanation: "Use the past simple for finished actions at a specific time in the past. Regular verbs add -ed; many common verbs are irregular.".into(),
                examples: strings(&["I visited Paris in 2019.", "We went to the cinema yesterday.", "She didn't call me last night."]),
            },
            vec![
                mcq("Yesterday I ____ a new jacket.", ["buy", "buyed", "bought", "buying"], 2),
                fill_blank("They ____ (not / see) the film last week.", "didn't see"),
                true_false("\"Did you went home?\" is correct.", false),
            ],
        ),
        lesson(
            LessonContent::Grammar {
                explanation: "Use the present perfect for past actions connected to now, often with ever, never, already, yet, for and since.".into(),
                examples: strings(&["I have lived here for five years.", "Have you ever eaten sushi?", "She has already finished her homework."]),
            },
            vec![
                mcq("I ____ this book three times.", ["read", "have read", "am reading", "was reading"], 1),
                fill_blank("We have known each other ____ 2015.", "since"),
                true_false("\"I have seen him yesterday\" is correct.", false),
            ],
        ),
    ]
}

fn vocabulary() -> Vec<LessonData> {
    vec![
        lesson(
            LessonContent::Vocabulary {
                words: vec![
                    word("commute", "to travel regularly between home and work", "I commute to the city by train.", &["travel"]),
                    word("colleague", "a person you work with", "My colleague helped me with the report.", &["coworker"]),
                    word("deadline", "the time by which something must be finished", "The deadline for the project is Friday.", &["due date"]),
                ],
            },
            vec![
                mcq("A person you work with is a ____.", ["neighbour", "colleague", "customer", "stranger"], 1),
                fill_blank("The ____ for the report is tomorrow, so I must finish tonight.", "deadline"),
                true_false("To commute means to travel between home and work.", true),
            ],
        ),
        lesson(
            LessonContent::Vocabulary {
                words: vec![
                    word("reliable", "can be trusted to do what is expected", "She is a reliable friend who always keeps her promises.", &["dependable", "trustworthy"]),
                    word("generous", "happy to give more than is expected", "He was generous with his time.", &["kind", "giving"]),
                    word("stubborn", "unwilling to change your opinion", "My brother is too stubborn to admit he is wrong.", &["obstinate"]),
                ],
            },
            vec![
                mcq("Someone who never changes their mind is ____.", ["generous", "reliable", "stubborn", "polite"], 2),
                fill_blank("A ____ car rarely breaks down.", "reliable"),
                true_false("A generous person dislikes giving things to others.", false),
            ],
        ),
        lesson(
            LessonContent::Vocabulary {
                words: vec![
                    word("mitigate", "to make something less harmful or serious", "Trees help mitigate the effects of air pollution.", &["reduce", "alleviate"]),
                    word("ubiquitous", "seeming to be everywhere", "Smartphones have become ubiquitous.", &["omnipresent"]),
                    word("scrutinize", "to examine something very carefully", "The committee will scrutinize the budget.", &["examine", "inspect"]),
                ],
            },
            vec![
                mcq("Which word means \"to examine very carefully\"?", ["mitigate", "scrutinize", "ubiquitous", "ignore"], 1),
                fill_blank("Coffee shops are ____ in this city; there is one on every corner.", "ubiquitous"),
                true_false("To mitigate a problem is to make it worse.", false),
            ],
        ),
    ]
}

/// Question served when an adaptive next task cannot be generated.
#[must_use]
pub fn fallback_question(now: DateTime<Utc>) -> Question {
    Question {
        id: format!("q-{}", now.timestamp_millis()),
        question: "Choose the correct option".to_string(),
        kind: QuestionType::Mcq,
        options: Some(strings(&["Option A", "Option B", "Option C", "Option D"])),
        correct_answer: Some(AnswerValue::from(0usize)),
        points: 10,
    }
}
